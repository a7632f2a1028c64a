//! Configuration types deserialized from `sigil.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The top-level link configuration parsed from `sigil.toml`.
#[derive(Debug, Deserialize)]
pub struct LinkConfig {
    /// Project metadata.
    pub project: ProjectMeta,
    /// Linker policy settings.
    #[serde(default)]
    pub link: LinkSettings,
    /// Incremental fingerprint cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Libraries taking part in the link, in dependency order.
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibraryConfig>,
    /// Expect signature text mapped to its actual signature text.
    #[serde(default)]
    pub expect_actual: BTreeMap<String, String>,
}

impl LinkConfig {
    /// Looks up a library by name.
    pub fn library(&self, name: &str) -> Option<&LibraryConfig> {
        self.libraries.iter().find(|lib| lib.name == name)
    }
}

/// Project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// Name of the module produced by the link.
    pub name: String,
}

/// Linker policy settings from the `[link]` table.
#[derive(Debug, Deserialize)]
pub struct LinkSettings {
    /// Substitute stubs for unresolvable references instead of failing.
    #[serde(default)]
    pub partial_linkage: bool,
    /// How loudly partial-linkage events are reported.
    #[serde(default)]
    pub partial_linkage_log: PartialLinkageLog,
    /// Strategy used for libraries that do not name one.
    #[serde(default)]
    pub default_strategy: StrategyName,
    /// Public signatures resolved first, in text form.
    #[serde(default)]
    pub entry: Vec<String>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            partial_linkage: false,
            partial_linkage_log: PartialLinkageLog::default(),
            default_strategy: StrategyName::default(),
            entry: Vec::new(),
        }
    }
}

/// Severity applied to partial-linkage events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialLinkageLog {
    /// Report nothing.
    Silent,
    /// Report as notes.
    Info,
    /// Report as warnings.
    #[default]
    Warning,
    /// Report as errors; stubs are still generated.
    Error,
}

/// Name of a deserialization strategy as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyName {
    /// Load every top level eagerly.
    All,
    /// Load top levels only when referenced.
    #[default]
    Referenced,
    /// Load declaration headers only.
    Headers,
    /// Load headers plus inline function bodies.
    InlineBodies,
    /// Do not index the file until asked.
    OnDemand,
    /// Load explicitly exported top levels eagerly, the rest when referenced.
    Exported,
}

/// Incremental cache settings from the `[cache]` table.
#[derive(Debug, Deserialize)]
pub struct CacheSettings {
    /// Whether the fingerprint cache is consulted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory, relative to the configuration file.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".sigil-cache")
}

/// One library archive taking part in the link.
#[derive(Debug, Deserialize)]
pub struct LibraryConfig {
    /// Module name of the library.
    pub name: String,
    /// Path to the archive, relative to the configuration file.
    pub path: PathBuf,
    /// Names of libraries this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Strategy for this library's files; falls back to `link.default_strategy`.
    #[serde(default)]
    pub strategy: Option<StrategyName>,
    /// Per-file strategy overrides keyed by archive file name.
    #[serde(default)]
    pub file_strategies: BTreeMap<String, StrategyName>,
    /// Wrap the library with the synthesized function-type module.
    #[serde(default)]
    pub builtins: bool,
    /// Compute dirty files from the fingerprint cache for this library.
    #[serde(default)]
    pub incremental: bool,
}

impl LibraryConfig {
    /// Resolves the strategy name for one file of this library.
    pub fn strategy_for(&self, file: &str, default: StrategyName) -> StrategyName {
        self.file_strategies
            .get(file)
            .copied()
            .or(self.strategy)
            .unwrap_or(default)
    }
}
