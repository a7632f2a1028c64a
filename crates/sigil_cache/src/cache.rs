//! High-level fingerprint cache.

use std::path::{Path, PathBuf};

use sigil_archive::Archive;

use crate::changes::ChangeSet;
use crate::error::CacheError;
use crate::manifest::{CacheManifest, FileEntry, LibraryEntry};

/// Result of checking a library against the recorded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryStatus {
    /// The archive fingerprint matches; nothing needs rebuilding.
    UpToDate,
    /// Some files changed.
    Changed(ChangeSet),
    /// The library was never recorded; every file counts as added.
    Unknown(ChangeSet),
}

impl LibraryStatus {
    /// Files that must be rebuilt.
    pub fn dirty_files(&self) -> Vec<String> {
        match self {
            LibraryStatus::UpToDate => Vec::new(),
            LibraryStatus::Changed(changes) | LibraryStatus::Unknown(changes) => {
                changes.dirty_files()
            }
        }
    }

    /// Returns `true` for [`LibraryStatus::UpToDate`].
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, LibraryStatus::UpToDate)
    }
}

/// Loads, compares and persists library fingerprints.
///
/// Loading is fail-safe: a missing, corrupt or incompatible manifest starts
/// an empty cache, which reports every library as [`LibraryStatus::Unknown`].
pub struct FingerprintCache {
    cache_dir: PathBuf,
    manifest: CacheManifest,
}

impl FingerprintCache {
    /// Loads an existing cache or creates a fresh one.
    pub fn load_or_create(cache_dir: &Path, sigil_version: &str) -> Self {
        let manifest = match CacheManifest::load(cache_dir) {
            Some(m) if m.is_compatible(sigil_version) => {
                tracing::debug!(dir = %cache_dir.display(), "fingerprint cache loaded");
                m
            }
            Some(_) => {
                tracing::debug!(dir = %cache_dir.display(), "fingerprint cache incompatible, discarding");
                CacheManifest::new(sigil_version)
            }
            None => CacheManifest::new(sigil_version),
        };
        Self {
            cache_dir: cache_dir.to_path_buf(),
            manifest,
        }
    }

    /// Compares `archive` against the snapshot recorded for `library`.
    pub fn check(&self, library: &str, archive: &Archive) -> LibraryStatus {
        let current = archive.file_fingerprints();
        let Some(entry) = self.manifest.libraries.get(library) else {
            tracing::debug!(library, "fingerprint cache miss");
            return LibraryStatus::Unknown(ChangeSet::all_added(&current));
        };
        let files: Vec<_> = current.iter().map(|(_, fp)| *fp).collect();
        if sigil_archive::archive_fingerprint(&files) == entry.archive {
            tracing::debug!(library, "fingerprint cache hit");
            return LibraryStatus::UpToDate;
        }
        let changes = ChangeSet::between(&entry.files, &current);
        tracing::debug!(
            library,
            added = changes.added.len(),
            modified = changes.modified.len(),
            removed = changes.removed.len(),
            "library changed"
        );
        LibraryStatus::Changed(changes)
    }

    /// Records the current fingerprints of `archive` for `library`.
    pub fn record(&mut self, library: &str, archive: &Archive) {
        let current = archive.file_fingerprints();
        let files: Vec<_> = current.iter().map(|(_, fp)| *fp).collect();
        let entry = LibraryEntry {
            archive: sigil_archive::archive_fingerprint(&files),
            files: current
                .into_iter()
                .map(|(name, fingerprint)| FileEntry { name, fingerprint })
                .collect(),
        };
        self.manifest.libraries.insert(library.to_string(), entry);
    }

    /// Drops the snapshot of `library`.
    pub fn forget(&mut self, library: &str) {
        self.manifest.libraries.remove(library);
    }

    /// Persists the manifest.
    pub fn save(&self) -> Result<(), CacheError> {
        self.manifest.save(&self.cache_dir)
    }

    /// Returns the current manifest.
    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_archive::ArchiveFile;

    fn archive(contents: &[(&str, &str)]) -> Archive {
        let mut archive = Archive::new("core");
        for (name, content) in contents {
            let mut file = ArchiveFile {
                name: name.to_string(),
                package: "pkg".into(),
                ..Default::default()
            };
            file.bodies.push(content.as_bytes());
            archive.files.push(file);
        }
        archive
    }

    #[test]
    fn unknown_library_is_all_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
        let status = cache.check("core", &archive(&[("a.kt", "a"), ("b.kt", "b")]));
        assert!(matches!(status, LibraryStatus::Unknown(_)));
        assert_eq!(status.dirty_files(), vec!["a.kt", "b.kt"]);
    }

    #[test]
    fn recorded_library_is_up_to_date_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let lib = archive(&[("a.kt", "a")]);
        {
            let mut cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
            cache.record("core", &lib);
            cache.save().unwrap();
        }
        let cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
        assert!(cache.check("core", &lib).is_up_to_date());
    }

    #[test]
    fn modified_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
        cache.record("core", &archive(&[("a.kt", "a"), ("b.kt", "b")]));
        let status = cache.check("core", &archive(&[("a.kt", "a"), ("b.kt", "changed")]));
        match status {
            LibraryStatus::Changed(changes) => {
                assert_eq!(changes.modified, vec!["b.kt"]);
                assert_eq!(changes.unchanged, vec!["a.kt"]);
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn version_change_discards_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let lib = archive(&[("a.kt", "a")]);
        {
            let mut cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
            cache.record("core", &lib);
            cache.save().unwrap();
        }
        let cache = FingerprintCache::load_or_create(dir.path(), "0.2.0");
        assert!(matches!(cache.check("core", &lib), LibraryStatus::Unknown(_)));
    }

    #[test]
    fn forget_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FingerprintCache::load_or_create(dir.path(), "0.1.0");
        cache.record("core", &archive(&[]));
        cache.forget("core");
        assert!(cache.manifest().libraries.is_empty());
    }
}
