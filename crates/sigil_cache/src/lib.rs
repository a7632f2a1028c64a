//! Fingerprint cache for incremental linking.
//!
//! Records, per library, the archive fingerprint and the fingerprint of every
//! file from the last successful link. Comparing a freshly read archive
//! against the record yields the set of dirty files the incremental overlay
//! needs to rebuild.

#![warn(missing_docs)]

pub mod cache;
pub mod changes;
pub mod error;
pub mod manifest;

pub use cache::{FingerprintCache, LibraryStatus};
pub use changes::ChangeSet;
pub use error::CacheError;
pub use manifest::{CacheManifest, FileEntry, LibraryEntry};
