//! The on-disk fingerprint manifest.
//!
//! Stored as `manifest.json` in the cache directory. Fingerprints are kept in
//! their human-readable text form so the manifest stays diffable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sigil_common::Fingerprint;

use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Manifest layout version. Manifests with another version are discarded.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Fingerprints recorded for every library of the last link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Manifest layout version.
    pub format_version: u32,
    /// Version of the tool that wrote the manifest.
    pub sigil_version: String,
    /// Per-library entries keyed by library name.
    pub libraries: BTreeMap<String, LibraryEntry>,
}

/// Recorded fingerprints of one library archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Archive fingerprint.
    #[serde(with = "fingerprint_text")]
    pub archive: Fingerprint,
    /// File fingerprints in archive order.
    pub files: Vec<FileEntry>,
}

/// Recorded fingerprint of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name.
    pub name: String,
    /// File fingerprint.
    #[serde(with = "fingerprint_text")]
    pub fingerprint: Fingerprint,
}

impl CacheManifest {
    /// Creates an empty manifest.
    pub fn new(sigil_version: &str) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            sigil_version: sigil_version.to_string(),
            libraries: BTreeMap::new(),
        }
    }

    /// Loads the manifest from the cache directory.
    ///
    /// Returns `None` if the file is missing or unparseable; the caller then
    /// starts from an empty manifest.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest, creating the cache directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns `true` if the manifest layout and tool version match.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.format_version == MANIFEST_FORMAT_VERSION && self.sigil_version == current_version
    }
}

mod fingerprint_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use sigil_common::Fingerprint;

    pub fn serialize<S: Serializer>(fp: &Fingerprint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(fp)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fingerprint, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LibraryEntry {
        LibraryEntry {
            archive: Fingerprint::from_bytes(b"archive"),
            files: vec![FileEntry {
                name: "a.kt".into(),
                fingerprint: Fingerprint::from_bytes(b"a"),
            }],
        }
    }

    #[test]
    fn fingerprints_are_written_as_text() {
        let mut m = CacheManifest::new("0.1.0");
        m.libraries.insert("core".into(), entry());
        let json: serde_json::Value = serde_json::to_value(&m).unwrap();
        let text = json["libraries"]["core"]["archive"].as_str().unwrap();
        assert_eq!(text, Fingerprint::from_bytes(b"archive").to_string());
        assert_eq!(json["format_version"], MANIFEST_FORMAT_VERSION);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = CacheManifest::new("0.1.0");
        m.libraries.insert("core".into(), entry());
        m.save(dir.path()).unwrap();
        assert_eq!(CacheManifest::load(dir.path()), Some(m));
    }

    #[test]
    fn load_corrupt_json_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();
        assert!(CacheManifest::load(dir.path()).is_none());
    }

    #[test]
    fn bad_fingerprint_text_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"format_version":1,"sigil_version":"0.1.0","libraries":{"core":{"archive":"zz","files":[]}}}"#;
        std::fs::write(dir.path().join("manifest.json"), json).unwrap();
        assert!(CacheManifest::load(dir.path()).is_none());
    }

    #[test]
    fn compatibility_checks_both_versions() {
        let mut m = CacheManifest::new("0.1.0");
        assert!(m.is_compatible("0.1.0"));
        assert!(!m.is_compatible("0.2.0"));
        m.format_version = MANIFEST_FORMAT_VERSION + 1;
        assert!(!m.is_compatible("0.1.0"));
    }
}
