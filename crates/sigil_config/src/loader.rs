//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::LinkConfig;
use std::collections::HashSet;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "sigil.toml";

/// Loads and validates a link configuration file.
///
/// `path` may name the file itself or a directory containing `sigil.toml`.
pub fn load_config(path: &Path) -> Result<LinkConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a link configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<LinkConfig, ConfigError> {
    let config: LinkConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks names and that every dependency is listed before its dependents.
fn validate_config(config: &LinkConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    let mut seen = HashSet::new();
    for lib in &config.libraries {
        if lib.name.is_empty() {
            return Err(ConfigError::MissingField("library.name".to_string()));
        }
        for dep in &lib.dependencies {
            if !seen.contains(dep.as_str()) {
                return Err(ConfigError::UnknownDependency {
                    library: lib.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        if !seen.insert(lib.name.as_str()) {
            return Err(ConfigError::DuplicateLibrary(lib.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PartialLinkageLog, StrategyName};

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "app"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "app");
        assert!(!config.link.partial_linkage);
        assert_eq!(config.link.default_strategy, StrategyName::Referenced);
        assert_eq!(config.link.partial_linkage_log, PartialLinkageLog::Warning);
        assert!(config.cache.enabled);
        assert!(config.libraries.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "app"

[link]
partial_linkage = true
partial_linkage_log = "error"
default_strategy = "inline-bodies"
entry = ["app/main"]

[cache]
enabled = false
dir = "build/cache"

[[library]]
name = "stdlib"
path = "libs/stdlib.sgla"
strategy = "all"
builtins = true

[[library]]
name = "app"
path = "app.sgla"
dependencies = ["stdlib"]
incremental = true

[library.file_strategies]
"gen.kt" = "on-demand"

[expect_actual]
"common/Clock|1#expect" = "jvm/Clock|2"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.link.partial_linkage);
        assert_eq!(config.link.partial_linkage_log, PartialLinkageLog::Error);
        assert_eq!(config.link.entry, vec!["app/main"]);
        assert!(!config.cache.enabled);
        assert_eq!(config.libraries.len(), 2);
        let stdlib = config.library("stdlib").unwrap();
        assert!(stdlib.builtins);
        assert_eq!(stdlib.strategy, Some(StrategyName::All));
        let app = config.library("app").unwrap();
        assert!(app.incremental);
        assert_eq!(
            app.strategy_for("gen.kt", config.link.default_strategy),
            StrategyName::OnDemand
        );
        assert_eq!(
            app.strategy_for("main.kt", config.link.default_strategy),
            StrategyName::InlineBodies
        );
        assert_eq!(config.expect_actual.len(), 1);
    }

    #[test]
    fn dependency_must_precede() {
        let toml = r#"
[project]
name = "app"

[[library]]
name = "app"
path = "app.sgla"
dependencies = ["stdlib"]

[[library]]
name = "stdlib"
path = "stdlib.sgla"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDependency { .. }));
    }

    #[test]
    fn duplicate_library_rejected() {
        let toml = r#"
[project]
name = "app"

[[library]]
name = "lib"
path = "a.sgla"

[[library]]
name = "lib"
path = "b.sgla"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateLibrary(name) if name == "lib"));
    }

    #[test]
    fn unknown_strategy_is_parse_error() {
        let toml = r#"
[project]
name = "app"

[link]
default_strategy = "eventually"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"on_disk\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "on_disk");
    }
}
