//! Repository selection: ordered add/remove rules over the discovered set.
//!
//! Rules run as a pipeline. An `add` rule scans every candidate and inserts
//! matches into the selection; a `remove` rule only looks at what is currently
//! selected. No rules at all selects every candidate.
//!
//! Patterns are full-string matches: `widget` does not match `widgets`.

use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ConfigError;
use crate::types::{FilterMode, FilterRule, RepositoryId, RepositoryInfo, RepositoryRecord};

/// A [`FilterRule`] with its patterns compiled.
#[derive(Debug, Clone)]
struct CompiledRule {
    mode: FilterMode,
    public: Option<bool>,
    archived: Option<bool>,
    names: Option<Vec<Regex>>,
    owner: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: &FilterRule) -> Result<Self, ConfigError> {
        let names = rule
            .match_name
            .as_ref()
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|p| full_match(p))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let owner = rule.match_owner.as_deref().map(full_match).transpose()?;
        Ok(Self {
            mode: rule.mode,
            public: rule.public,
            archived: rule.archived,
            names,
            owner,
        })
    }

    fn matches(&self, repo: &RepositoryInfo) -> bool {
        if self.public.is_some_and(|public| public != repo.public) {
            return false;
        }
        if self.archived.is_some_and(|archived| archived != repo.archived) {
            return false;
        }
        if let Some(names) = &self.names {
            if !names.iter().any(|re| re.is_match(&repo.name)) {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if !owner.is_match(&repo.owner) {
                return false;
            }
        }
        true
    }
}

fn full_match(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Compiled, reusable rule pipeline.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    rules: Vec<CompiledRule>,
}

impl FilterEngine {
    /// Compile every pattern up front so a bad config fails before any
    /// repository work.
    pub fn compile(rules: &[FilterRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Run the pipeline over `candidates`.
    ///
    /// Output order is the order in which repositories first entered the
    /// selection; a later `add` that matches an already-selected repository
    /// refreshes it in place.
    pub fn select(&self, candidates: &[RepositoryInfo]) -> Vec<RepositoryRecord> {
        let mut selection = Selection::default();

        if self.rules.is_empty() {
            for candidate in candidates {
                selection.insert(candidate);
            }
            return selection.into_records();
        }

        for rule in &self.rules {
            match rule.mode {
                FilterMode::Add => {
                    for candidate in candidates.iter().filter(|c| rule.matches(c)) {
                        selection.insert(candidate);
                    }
                }
                FilterMode::Remove => selection.retain(|c| !rule.matches(c)),
            }
        }
        selection.into_records()
    }
}

/// Compile `rules` and apply them to `candidates`.
pub fn select(
    candidates: &[RepositoryInfo],
    rules: &[FilterRule],
) -> Result<Vec<RepositoryRecord>, ConfigError> {
    Ok(FilterEngine::compile(rules)?.select(candidates))
}

/// Insertion-ordered selection keyed by `owner/name`.
#[derive(Default)]
struct Selection<'a> {
    items: Vec<&'a RepositoryInfo>,
    index: HashMap<RepositoryId, usize>,
}

impl<'a> Selection<'a> {
    fn insert(&mut self, repo: &'a RepositoryInfo) {
        match self.index.get(&repo.id()) {
            Some(&pos) => self.items[pos] = repo,
            None => {
                self.index.insert(repo.id(), self.items.len());
                self.items.push(repo);
            }
        }
    }

    fn retain(&mut self, keep: impl Fn(&RepositoryInfo) -> bool) {
        self.items.retain(|repo| keep(repo));
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, repo)| (repo.id(), pos))
            .collect();
    }

    fn into_records(self) -> Vec<RepositoryRecord> {
        self.items.into_iter().map(RepositoryInfo::to_record).collect()
    }
}

// ---------------------------------------------------------------------------
// Rule generation from search results
// ---------------------------------------------------------------------------

/// One `add` rule per owner (first-seen order) that selects exactly `repos`.
///
/// Owner and names are regex-escaped so they match literally.
pub fn rules_from_repositories(
    repos: &[RepositoryInfo],
    public: Option<bool>,
    archived: Option<bool>,
) -> Vec<FilterRule> {
    let mut owners: Vec<(&str, Vec<String>)> = Vec::new();
    for repo in repos {
        let escaped = regex::escape(&repo.name);
        match owners.iter_mut().find(|(owner, _)| *owner == repo.owner) {
            Some((_, names)) => names.push(escaped),
            None => owners.push((&repo.owner, vec![escaped])),
        }
    }

    owners
        .into_iter()
        .map(|(owner, names)| FilterRule {
            mode: FilterMode::Add,
            public,
            archived,
            match_name: Some(names),
            match_owner: Some(regex::escape(owner)),
        })
        .collect()
}

/// Header comment placed above generated rules.
pub fn search_comment(description: Option<&str>, date: NaiveDate, found: usize) -> String {
    let date = date.format("%Y-%m-%d");
    let first = match description {
        Some(description) => format!("Added by auto-pr search: {description} ({date})"),
        None => format!("Added by auto-pr search ({date})"),
    };
    format!("{first}\nFound {found} repositories")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
