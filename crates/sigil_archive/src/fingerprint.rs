//! Content fingerprints of files and archives.
//!
//! A file fingerprint folds the fingerprints of its five content tables in a
//! fixed order (declarations, types, signatures, strings, bodies). Debug info
//! and the top-level lists are derived data and do not participate. An
//! archive fingerprint folds its file fingerprints in archive order followed
//! by the file count.

use crate::archive::Archive;
use crate::file::ArchiveFile;
use sigil_common::{Fingerprint, FingerprintBuilder};

/// Computes the fingerprint of one file.
pub fn file_fingerprint(file: &ArchiveFile) -> Fingerprint {
    let mut builder = FingerprintBuilder::new();
    for table in [
        &file.declarations,
        &file.types,
        &file.signatures,
        &file.strings,
        &file.bodies,
    ] {
        builder.fingerprint(table.fingerprint());
    }
    builder.finish()
}

/// Folds file fingerprints, in archive order, into an archive fingerprint.
pub fn archive_fingerprint(files: &[Fingerprint]) -> Fingerprint {
    let mut builder = FingerprintBuilder::new();
    for fingerprint in files {
        builder.fingerprint(*fingerprint);
    }
    builder.u64(files.len() as u64);
    builder.finish()
}

impl Archive {
    /// Fingerprints of every file, in archive order.
    pub fn file_fingerprints(&self) -> Vec<(String, Fingerprint)> {
        self.files
            .iter()
            .map(|f| (f.name.clone(), file_fingerprint(f)))
            .collect()
    }

    /// The archive fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let files: Vec<Fingerprint> = self.files.iter().map(file_fingerprint).collect();
        archive_fingerprint(&files)
    }
}
