//! `auto-pr search <query>`: turn a code search into filter rules.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autopr_core::{config, filter, FilterRule, WorkDir};
use autopr_forge::{CodeSearch, Forge};

use super::{forge, load_config};

/// Arguments for `auto-pr search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// GitHub code search query, e.g. `filename:Dockerfile org:acme`.
    pub query: String,

    /// Stop after this many distinct repositories.
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub max_repos: usize,

    /// Only public repositories.
    #[arg(long, conflicts_with = "private")]
    pub public: bool,

    /// Only private repositories.
    #[arg(long)]
    pub private: bool,

    /// Only archived repositories.
    #[arg(long, conflicts_with = "not_archived")]
    pub archived: bool,

    /// Skip archived repositories.
    #[arg(long)]
    pub not_archived: bool,

    /// Note recorded in the generated header comment.
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Append the rules to config.yaml instead of printing them.
    #[arg(long)]
    pub append: bool,
}

impl SearchArgs {
    pub fn run(self, workdir: &WorkDir) -> Result<()> {
        let config = load_config(workdir)?;
        let public = tristate(self.public, self.private);
        let archived = tristate(self.archived, self.not_archived);

        let search = CodeSearch {
            query: self.query.clone(),
            public,
            archived,
            max_repos: Some(self.max_repos),
        };
        let repos = forge(&config)
            .search_code(&search)
            .with_context(|| format!("code search for '{}' failed", self.query))?;
        if repos.is_empty() {
            println!("No repositories found for '{}'", self.query);
            return Ok(());
        }

        let rules = filter::rules_from_repositories(&repos, public, archived);
        let today = chrono::Local::now().date_naive();
        let comment = filter::search_comment(self.description.as_deref(), today, repos.len());

        if self.append {
            let path = workdir.config_file();
            config::append_rules_at(&path, &rules)
                .with_context(|| format!("failed to append rules to {}", path.display()))?;
            println!("{}", yaml_comment(&comment));
            println!(
                "{} Appended {} rules to {}",
                "✓".green(),
                rules.len(),
                path.display()
            );
            return Ok(());
        }

        println!("{}", yaml_comment(&comment));
        print!("{}", rules_yaml(&rules)?);
        Ok(())
    }
}

fn tristate(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn yaml_comment(comment: &str) -> String {
    comment
        .lines()
        .map(|line| format!("# {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The rules as a `repositories:` block ready to paste into config.yaml.
fn rules_yaml(rules: &[FilterRule]) -> Result<String> {
    #[derive(serde::Serialize)]
    struct Block<'a> {
        repositories: &'a [FilterRule],
    }
    serde_yaml::to_string(&Block { repositories: rules }).context("failed to render rules as YAML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tristate_flags() {
        assert_eq!(tristate(false, false), None);
        assert_eq!(tristate(true, false), Some(true));
        assert_eq!(tristate(false, true), Some(false));
    }

    #[test]
    fn comment_lines_are_prefixed() {
        assert_eq!(yaml_comment("a\nb"), "# a\n# b");
    }

    #[test]
    fn rules_render_under_repositories_key() {
        let yaml = rules_yaml(&[FilterRule::add().match_owner("acme")]).unwrap();
        assert!(yaml.starts_with("repositories:\n"), "{yaml}");
        assert!(yaml.contains("mode: add"), "{yaml}");
        assert!(yaml.contains("match_owner: acme"), "{yaml}");
    }
}
