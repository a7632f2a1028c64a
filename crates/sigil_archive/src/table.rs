//! Indexed tables of opaque byte records.

use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use sigil_common::{Fingerprint, FingerprintBuilder};
use std::fmt;

/// Identifies one of a file's tables, for error messages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TableKind {
    /// Top-level declaration records.
    Declarations,
    /// Type records.
    Types,
    /// Signature records.
    Signatures,
    /// Raw string records.
    Strings,
    /// Function body and initializer records.
    Bodies,
    /// Debug-info string records.
    DebugInfo,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Declarations => "declarations",
            TableKind::Types => "types",
            TableKind::Signatures => "signatures",
            TableKind::Strings => "strings",
            TableKind::Bodies => "bodies",
            TableKind::DebugInfo => "debug info",
        };
        f.write_str(name)
    }
}

/// A sequence of byte records addressed by `u32` index.
///
/// Records are stored back to back in one buffer; `ends[i]` is the end
/// offset of record `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    ends: Vec<u32>,
    data: Vec<u8>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its index.
    pub fn push(&mut self, record: &[u8]) -> u32 {
        let index = self.ends.len() as u32;
        self.data.extend_from_slice(record);
        self.ends.push(self.data.len() as u32);
        index
    }

    /// Returns the bytes of record `index`.
    pub fn get(&self, index: u32) -> Option<&[u8]> {
        let i = index as usize;
        let end = *self.ends.get(i)? as usize;
        let start = if i == 0 { 0 } else { self.ends[i - 1] as usize };
        self.data.get(start..end)
    }

    /// Returns the bytes of record `index`, or an out-of-bounds error naming `kind`.
    pub fn record(&self, kind: TableKind, index: u32) -> Result<&[u8], ArchiveError> {
        self.get(index).ok_or(ArchiveError::IndexOutOfBounds {
            table: kind,
            index,
            len: self.len(),
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns `true` if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Iterates over records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.ends.len() as u32).filter_map(move |i| self.get(i))
    }

    /// Content fingerprint: record count, then each record's length and bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new();
        builder.u64(self.len() as u64);
        for record in self.iter() {
            builder.u64(record.len() as u64).update(record);
        }
        builder.finish()
    }

    /// Mutable access to the raw record buffer, for corruption tests.
    #[doc(hidden)]
    pub fn raw_data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}
