//! Decoding signature records into [`Signature`] values.

use crate::error::{LinkError, LinkResult};
use sigil_archive::records::SignatureRecord;
use sigil_archive::ArchiveFile;
use sigil_ir::signature::{PublicSignature, Signature, SignatureFlags};
use std::collections::HashMap;

/// Per-file memoizing signature decoder.
#[derive(Debug, Default)]
pub struct SignatureCodec {
    cache: HashMap<u32, Signature>,
    in_progress: Vec<u32>,
}

impl SignatureCodec {
    /// Creates an empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes signature record `index` of `file`.
    pub fn decode(&mut self, file: &ArchiveFile, index: u32) -> LinkResult<Signature> {
        if let Some(sig) = self.cache.get(&index) {
            return Ok(sig.clone());
        }
        if self.in_progress.contains(&index) {
            return Err(LinkError::format(format!(
                "signature record {index} refers to itself"
            )));
        }
        self.in_progress.push(index);
        let decoded = self.decode_record(file, index);
        self.in_progress.pop();
        let sig = decoded?;
        self.cache.insert(index, sig.clone());
        Ok(sig)
    }

    fn decode_record(&mut self, file: &ArchiveFile, index: u32) -> LinkResult<Signature> {
        let sig = match file.signature_record(index)? {
            SignatureRecord::Public {
                package,
                declaration,
                id,
                flags,
            } => {
                let flags = SignatureFlags::from_bits(flags).ok_or_else(|| {
                    LinkError::format(format!("signature record {index} has unknown flag bits {flags:#x}"))
                })?;
                Signature::Public(PublicSignature {
                    package: file.string(package)?.into_owned(),
                    declaration: file.string(declaration)?.into_owned(),
                    id,
                    flags,
                })
            }
            SignatureRecord::Accessor { property, accessor } => Signature::Accessor {
                property: self.public(file, property)?,
                accessor: self.public(file, accessor)?,
            },
            SignatureRecord::FileLocal {
                container,
                local_id,
            } => Signature::FileLocal {
                container: Box::new(self.decode(file, container)?),
                id: local_id,
            },
            SignatureRecord::ScopedLocal { local_id } => Signature::ScopedLocal(local_id),
            SignatureRecord::Composite { container, inner } => Signature::Composite {
                container: Box::new(self.decode(file, container)?),
                inner: Box::new(self.decode(file, inner)?),
            },
            SignatureRecord::File { name } => Signature::File(file.string(name)?.into_owned()),
            SignatureRecord::Unset => {
                return Err(LinkError::format(format!(
                    "signature record {index} is unset"
                )))
            }
        };
        Ok(sig)
    }

    fn public(&mut self, file: &ArchiveFile, index: u32) -> LinkResult<PublicSignature> {
        match self.decode(file, index)? {
            Signature::Public(public) => Ok(public),
            other => Err(LinkError::format(format!(
                "accessor part {index} is not a public signature: `{other}`"
            ))),
        }
    }

    /// Number of memoized signatures.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing has been decoded yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
