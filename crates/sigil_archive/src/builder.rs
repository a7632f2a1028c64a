//! Producing archives from records.
//!
//! [`FileBuilder`] interns strings, signatures and types so that equal
//! values share one table entry, the way a compiler back end writes them.
//! Encoding errors are latched and reported once by [`FileBuilder::finish`].

use crate::archive::Archive;
use crate::error::ArchiveError;
use crate::file::{ArchiveFile, TopLevelEntry};
use crate::records::{encode_record, BodyRecord, DeclRecord, SignatureRecord, SymbolRef, TypeRecord};
use crate::table::{Table, TableKind};
use serde::Serialize;
use sigil_ir::signature::{PublicSignature, Signature};
use sigil_ir::symbol::SymbolKind;
use std::collections::HashMap;

/// Builds one [`ArchiveFile`].
pub struct FileBuilder {
    file: ArchiveFile,
    strings: HashMap<Vec<u8>, u32>,
    signatures: HashMap<Signature, u32>,
    types: HashMap<TypeRecord, u32>,
    error: Option<ArchiveError>,
}

impl FileBuilder {
    /// Starts a file with the given name and package.
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            file: ArchiveFile {
                name: name.into(),
                package: package.into(),
                ..Default::default()
            },
            strings: HashMap::new(),
            signatures: HashMap::new(),
            types: HashMap::new(),
            error: None,
        }
    }

    /// Enables the debug-info table.
    pub fn with_debug_info(mut self) -> Self {
        self.file.debug_info = Some(Table::new());
        self
    }

    /// Interns a string.
    pub fn string(&mut self, text: &str) -> u32 {
        self.raw_string(text.as_bytes())
    }

    /// Interns raw string bytes, which need not be valid UTF-8.
    pub fn raw_string(&mut self, bytes: &[u8]) -> u32 {
        if let Some(&index) = self.strings.get(bytes) {
            return index;
        }
        let index = self.file.strings.push(bytes);
        self.strings.insert(bytes.to_vec(), index);
        index
    }

    /// Interns a signature, encoding its components first.
    pub fn signature(&mut self, signature: &Signature) -> u32 {
        if let Some(&index) = self.signatures.get(signature) {
            return index;
        }
        let record = match signature {
            Signature::Public(public) => self.public_record(public),
            Signature::Accessor { property, accessor } => SignatureRecord::Accessor {
                property: self.signature(&Signature::Public(property.clone())),
                accessor: self.signature(&Signature::Public(accessor.clone())),
            },
            Signature::FileLocal { container, id } => SignatureRecord::FileLocal {
                container: self.signature(container),
                local_id: *id,
            },
            Signature::ScopedLocal(id) => SignatureRecord::ScopedLocal { local_id: *id },
            Signature::Composite { container, inner } => SignatureRecord::Composite {
                container: self.signature(container),
                inner: self.signature(inner),
            },
            Signature::File(name) => SignatureRecord::File {
                name: self.string(name),
            },
        };
        let index = self.push(TableKind::Signatures, &record);
        self.signatures.insert(signature.clone(), index);
        index
    }

    fn public_record(&mut self, public: &PublicSignature) -> SignatureRecord {
        SignatureRecord::Public {
            package: self.string(&public.package),
            declaration: self.string(&public.declaration),
            id: public.id,
            flags: public.flags.bits(),
        }
    }

    /// Builds a symbol reference.
    pub fn symbol(&mut self, kind: SymbolKind, signature: &Signature) -> SymbolRef {
        SymbolRef {
            kind,
            signature: self.signature(signature),
        }
    }

    /// Interns a type record.
    pub fn type_record(&mut self, record: TypeRecord) -> u32 {
        if let Some(&index) = self.types.get(&record) {
            return index;
        }
        let index = self.push(TableKind::Types, &record);
        self.types.insert(record, index);
        index
    }

    /// Interns the non-null, argument-free type of a class.
    pub fn class_type(&mut self, class: &Signature) -> u32 {
        let classifier = self.symbol(SymbolKind::Class, class);
        self.type_record(TypeRecord::Simple {
            classifier,
            arguments: Vec::new(),
            nullable: false,
        })
    }

    /// Appends a body record.
    pub fn body(&mut self, record: &BodyRecord) -> u32 {
        self.push(TableKind::Bodies, record)
    }

    /// Appends a debug string; `None` if debug info is disabled.
    pub fn debug_info(&mut self, text: &str) -> Option<u32> {
        self.file
            .debug_info
            .as_mut()
            .map(|table| table.push(text.as_bytes()))
    }

    /// Appends a top-level declaration and lists its signature as a top level.
    pub fn declare(&mut self, record: &DeclRecord) -> u32 {
        let declaration = self.push(TableKind::Declarations, record);
        self.file.top_level.push(TopLevelEntry {
            signature: record.symbol.signature,
            declaration,
        });
        declaration
    }

    /// Marks a top-level signature as explicitly exported.
    pub fn export(&mut self, signature: &Signature) {
        let index = self.signature(signature);
        self.file.exported.push(index);
    }

    /// Appends raw bytes to a table, bypassing the record schema.
    pub fn raw_record(&mut self, kind: TableKind, bytes: &[u8]) -> u32 {
        match self.file.table_mut(kind) {
            Some(table) => table.push(bytes),
            None => {
                self.latch(ArchiveError::Serialization {
                    reason: format!("file has no {kind} table"),
                });
                u32::MAX
            }
        }
    }

    /// Finishes the file, reporting the first encoding error if any.
    pub fn finish(self) -> Result<ArchiveFile, ArchiveError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.file),
        }
    }

    fn push<T: Serialize>(&mut self, kind: TableKind, record: &T) -> u32 {
        match encode_record(record) {
            Ok(bytes) => self.raw_record(kind, &bytes),
            Err(error) => {
                self.latch(error);
                u32::MAX
            }
        }
    }

    fn latch(&mut self, error: ArchiveError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Builds an [`Archive`] from files.
pub struct ArchiveBuilder {
    archive: Archive,
    error: Option<ArchiveError>,
}

impl ArchiveBuilder {
    /// Starts an archive for the named library.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            archive: Archive::new(name),
            error: None,
        }
    }

    /// Appends a finished file.
    pub fn file(mut self, file: FileBuilder) -> Self {
        match file.finish() {
            Ok(file) => self.archive.files.push(file),
            Err(error) => {
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
        }
        self
    }

    /// Finishes the archive.
    pub fn build(self) -> Result<Archive, ArchiveError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.archive),
        }
    }
}
