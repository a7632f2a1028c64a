//! The compiled library archive format consumed by the linker.
//!
//! An [`Archive`] is an ordered list of [`ArchiveFile`]s. Each file carries
//! five independently indexed [`Table`]s (declarations, types, signatures,
//! strings, bodies), an optional debug-info table, the list of top-level
//! signatures it declares and the subset that is explicitly exported.
//! Records inside tables follow the schema in [`records`] and are decoded on
//! demand. The [`fingerprint`] module derives content fingerprints used for
//! incremental up-to-date checks, and [`ArchiveBuilder`] produces archives
//! for tooling and tests.

#![warn(missing_docs)]

pub mod archive;
pub mod builder;
pub mod error;
pub mod file;
pub mod fingerprint;
pub mod records;
pub mod table;

pub use archive::{Archive, ARCHIVE_EXTENSION, ARCHIVE_FORMAT_VERSION};
pub use builder::{ArchiveBuilder, FileBuilder};
pub use error::ArchiveError;
pub use file::{ArchiveFile, TopLevelEntry};
pub use fingerprint::{archive_fingerprint, file_fingerprint};
pub use table::{Table, TableKind};
