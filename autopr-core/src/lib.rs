//! auto-pr core library: data model, repository selection, state
//! reconciliation and persistence, configuration, work directory layout.
//!
//! - [`types`]: records, rules, templates, config structs
//! - [`filter`]: [`FilterEngine`] and rule generation from search results
//! - [`reconcile`]: merge a discovery into the persisted state
//! - [`state`]: `db.json` load / save and lifecycle resets
//! - [`config`]: `config.yaml` load / save with `${NAME}` expansion
//! - [`workdir`]: [`WorkDir`] paths and `init`

pub mod config;
pub mod error;
pub mod filter;
pub mod reconcile;
pub mod state;
pub mod types;
pub mod workdir;

pub use error::{ConfigError, InitError, StateError};
pub use filter::FilterEngine;
pub use reconcile::Discovery;
pub use types::{
    Account, Config, Credentials, FilterMode, FilterRule, PersistedState, PrTemplate,
    RepositoryId, RepositoryInfo, RepositoryRecord,
};
pub use workdir::{working_copy, InitReport, WorkDir};
