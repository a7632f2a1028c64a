//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reading the cache is fail-safe (a broken manifest is a cache miss), so in
/// practice these surface only when saving.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache manifest could not be parsed as valid JSON.
    #[error("failed to parse cache manifest: {reason}")]
    ManifestParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A serialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_io() {
        let err = CacheError::Io {
            path: PathBuf::from(".sigil-cache/manifest.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains(".sigil-cache/manifest.json"));
    }

    #[test]
    fn display_manifest_parse() {
        let err = CacheError::ManifestParse {
            reason: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse cache manifest: expected value"
        );
    }
}
