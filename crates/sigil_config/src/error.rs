//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `sigil.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Two libraries share a name.
    #[error("duplicate library '{0}'")]
    DuplicateLibrary(String),

    /// A library depends on a library that is unknown or listed after it.
    #[error("library '{library}' depends on '{dependency}', which is not listed before it")]
    UnknownDependency {
        /// The library declaring the dependency.
        library: String,
        /// The dependency that could not be found.
        dependency: String,
    },
}
