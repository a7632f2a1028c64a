//! One compiled source file inside an archive.

use crate::error::ArchiveError;
use crate::records::{
    decode_record, BodyRecord, DeclRecord, SignatureIndex, SignatureRecord, TypeRecord,
};
use crate::table::{Table, TableKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Pairs a top-level signature with the declaration record that declares it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TopLevelEntry {
    /// Index into the signatures table.
    pub signature: SignatureIndex,
    /// Index into the declarations table.
    pub declaration: u32,
}

/// A compiled file: its tables plus the top-level and export lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveFile {
    /// File name, unique within the archive.
    pub name: String,
    /// Package the file belongs to.
    pub package: String,
    /// Top-level declaration records.
    pub declarations: Table,
    /// Type records.
    pub types: Table,
    /// Signature records.
    pub signatures: Table,
    /// Raw UTF-8 string records.
    pub strings: Table,
    /// Body records.
    pub bodies: Table,
    /// Optional debug-info strings.
    pub debug_info: Option<Table>,
    /// Every top-level declaration of the file.
    pub top_level: Vec<TopLevelEntry>,
    /// Signatures of explicitly exported top levels.
    pub exported: Vec<SignatureIndex>,
}

impl ArchiveFile {
    /// Reads string `index`. Invalid UTF-8 is replaced, not rejected.
    pub fn string(&self, index: u32) -> Result<Cow<'_, str>, ArchiveError> {
        let bytes = self.strings.record(TableKind::Strings, index)?;
        Ok(String::from_utf8_lossy(bytes))
    }

    /// Reads debug string `index`; `None` when the file has no debug info.
    pub fn debug_string(&self, index: u32) -> Result<Option<Cow<'_, str>>, ArchiveError> {
        match &self.debug_info {
            Some(table) => {
                let bytes = table.record(TableKind::DebugInfo, index)?;
                Ok(Some(String::from_utf8_lossy(bytes)))
            }
            None => Ok(None),
        }
    }

    /// Decodes signature record `index`.
    pub fn signature_record(&self, index: u32) -> Result<SignatureRecord, ArchiveError> {
        let bytes = self.signatures.record(TableKind::Signatures, index)?;
        decode_record(bytes, TableKind::Signatures, index)
    }

    /// Decodes type record `index`.
    pub fn type_record(&self, index: u32) -> Result<TypeRecord, ArchiveError> {
        let bytes = self.types.record(TableKind::Types, index)?;
        decode_record(bytes, TableKind::Types, index)
    }

    /// Decodes declaration record `index`.
    pub fn declaration_record(&self, index: u32) -> Result<DeclRecord, ArchiveError> {
        let bytes = self.declarations.record(TableKind::Declarations, index)?;
        decode_record(bytes, TableKind::Declarations, index)
    }

    /// Decodes body record `index`.
    pub fn body_record(&self, index: u32) -> Result<BodyRecord, ArchiveError> {
        let bytes = self.bodies.record(TableKind::Bodies, index)?;
        decode_record(bytes, TableKind::Bodies, index)
    }

    /// Returns the table of the given kind.
    pub fn table(&self, kind: TableKind) -> Option<&Table> {
        match kind {
            TableKind::Declarations => Some(&self.declarations),
            TableKind::Types => Some(&self.types),
            TableKind::Signatures => Some(&self.signatures),
            TableKind::Strings => Some(&self.strings),
            TableKind::Bodies => Some(&self.bodies),
            TableKind::DebugInfo => self.debug_info.as_ref(),
        }
    }

    /// Mutable access to a table, for corruption tests.
    #[doc(hidden)]
    pub fn table_mut(&mut self, kind: TableKind) -> Option<&mut Table> {
        match kind {
            TableKind::Declarations => Some(&mut self.declarations),
            TableKind::Types => Some(&mut self.types),
            TableKind::Signatures => Some(&mut self.signatures),
            TableKind::Strings => Some(&mut self.strings),
            TableKind::Bodies => Some(&mut self.bodies),
            TableKind::DebugInfo => self.debug_info.as_mut(),
        }
    }
}
