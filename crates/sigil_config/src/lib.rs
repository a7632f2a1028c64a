//! Parsing and validation of `sigil.toml` link configuration files.
//!
//! This crate reads the link configuration and produces a strongly-typed
//! [`LinkConfig`]: the libraries taking part in the link (in dependency
//! order), their loading strategies, partial-linkage policy, entry points,
//! expect/actual pairs and incremental cache settings.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
