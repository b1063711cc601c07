//! `config.yaml` loading and writing.
//!
//! Loading parses the file into a raw YAML tree, expands `${NAME}`
//! placeholders in every string scalar against the environment, and only
//! then deserialises into [`Config`]. A placeholder naming an unset variable
//! is an error.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::Value;

use crate::error::{config_io, ConfigError};
use crate::filter::FilterEngine;
use crate::types::{Config, FilterRule};

const PLACEHOLDER_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN));

fn placeholder() -> Result<&'static Regex, ConfigError> {
    PLACEHOLDER
        .as_ref()
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: PLACEHOLDER_PATTERN.to_string(),
            source: source.clone(),
        })
}

// ---------------------------------------------------------------------------
// Environment expansion
// ---------------------------------------------------------------------------

/// Expand `${NAME}` placeholders in `input` from the process environment.
pub fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand `${NAME}` placeholders in `input` using `lookup`.
pub fn expand_with(
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = placeholder()?.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ConfigError::MissingEnvVar { name }),
        None => Ok(expanded.into_owned()),
    }
}

fn expand_value(value: Value, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Value, ConfigError> {
    Ok(match value {
        Value::String(s) => Value::String(expand_with(&s, lookup)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|v| expand_value(v, lookup))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, expand_value(v, lookup)?);
            }
            Value::Mapping(out)
        }
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load `config.yaml` at `path`, expanding placeholders from the environment.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load `config.yaml` at `path`, expanding placeholders with `lookup`.
///
/// Filter patterns are compiled as part of loading, so a config that loads
/// is a config whose rules can run.
pub fn load_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let raw = load_raw_at(path)?;
    let expanded = expand_value(raw, &lookup)?;
    let config: Config = serde_yaml::from_value(expanded).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    FilterEngine::compile(&config.repositories)?;
    Ok(config)
}

/// The config file as an unexpanded YAML tree.
pub fn load_raw_at(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| config_io(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `config` to `path` (mode `0600`; it holds the API key).
pub fn save_at(path: &Path, config: &Config) -> Result<(), ConfigError> {
    write_yaml(path, &serde_yaml::to_value(config)?)
}

/// Append `rules` to the `repositories` list of the config at `path`.
///
/// Works on the raw tree so `${NAME}` placeholders elsewhere in the file are
/// written back unexpanded.
pub fn append_rules_at(path: &Path, rules: &[FilterRule]) -> Result<(), ConfigError> {
    let mut raw = load_raw_at(path)?;
    let Value::Mapping(map) = &mut raw else {
        return Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source: <serde_yaml::Error as serde::de::Error>::custom("config root is not a mapping"),
        });
    };

    let key = Value::String("repositories".to_string());
    let mut list = match map.remove(&key) {
        Some(Value::Sequence(items)) => items,
        _ => Vec::new(),
    };
    for rule in rules {
        list.push(serde_yaml::to_value(rule)?);
    }
    map.insert(key, Value::Sequence(list));
    write_yaml(path, &raw)
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(value)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| config_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| config_io(path, e))
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| config_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
