//! Error types for archive reading and decoding.

use crate::table::TableKind;
use sigil_common::Fingerprint;
use std::path::PathBuf;

/// Errors raised while reading an archive or decoding one of its records.
///
/// All of these indicate format corruption or an encoder/decoder version
/// mismatch; none of them is recoverable by the linker.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// An I/O error occurred while reading or writing an archive.
    #[error("archive I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The container header is missing or malformed.
    #[error("invalid archive header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The container was written by an incompatible format version.
    #[error("archive format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The supported format version.
        expected: u32,
        /// The version found in the file.
        actual: u32,
    },

    /// The payload does not match the checksum recorded in the header.
    #[error("archive checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum from the header.
        expected: Fingerprint,
        /// Checksum of the payload actually read.
        actual: Fingerprint,
    },

    /// A record index points past the end of its table.
    #[error("{table} index {index} out of bounds (table has {len} records)")]
    IndexOutOfBounds {
        /// The table being indexed.
        table: TableKind,
        /// The requested index.
        index: u32,
        /// Number of records in the table.
        len: usize,
    },

    /// A record's bytes do not decode under the record schema.
    #[error("malformed {table} record {index}: {reason}")]
    MalformedRecord {
        /// The table holding the record.
        table: TableKind,
        /// The record index.
        index: u32,
        /// Decoder message.
        reason: String,
    },

    /// Encoding a record or container failed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}
