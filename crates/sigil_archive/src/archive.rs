//! The on-disk archive container.
//!
//! Layout: a 4-byte little-endian header length, a bincode-encoded
//! [`ArchiveHeader`], then the bincode-encoded archive payload. The header
//! carries magic bytes, the format version and a fingerprint of the payload.
//! Unlike cache artifacts, an archive that fails validation is an error: the
//! linker cannot proceed without it.

use crate::error::ArchiveError;
use crate::file::ArchiveFile;
use serde::{Deserialize, Serialize};
use sigil_common::Fingerprint;
use std::path::Path;

/// Magic bytes identifying a sigil library archive.
const ARCHIVE_MAGIC: [u8; 4] = *b"SGLA";

/// Current container format version.
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// Conventional file extension of archives.
pub const ARCHIVE_EXTENSION: &str = "sgla";

/// Header prepended to every archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveHeader {
    /// Magic bytes: must be `b"SGLA"`.
    pub magic: [u8; 4],
    /// Container format version.
    pub format_version: u32,
    /// Version of the tool that wrote the archive.
    pub producer: String,
    /// Fingerprint of the payload bytes.
    pub checksum: Fingerprint,
}

/// A compiled library: a name plus its files in a fixed order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    /// Library name.
    pub name: String,
    /// Files in archive order. File indices are positions in this list.
    pub files: Vec<ArchiveFile>,
}

impl Archive {
    /// Creates an empty archive.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// Returns the index of the file called `name`.
    pub fn file_index(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }

    /// Returns the file called `name`.
    pub fn file(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Serializes the archive into its container form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let payload = encode(self)?;
        let header = ArchiveHeader {
            magic: ARCHIVE_MAGIC,
            format_version: ARCHIVE_FORMAT_VERSION,
            producer: env!("CARGO_PKG_VERSION").to_string(),
            checksum: Fingerprint::from_bytes(&payload),
        };
        let header_bytes = encode(&header)?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);
        Ok(output)
    }

    /// Parses and validates an archive container.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ArchiveError> {
        let invalid = |reason: &str| ArchiveError::InvalidHeader {
            reason: reason.to_string(),
        };

        let len_bytes: [u8; 4] = raw
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| invalid("file shorter than the header length prefix"))?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;
        let header_bytes = raw
            .get(4..4 + header_len)
            .ok_or_else(|| invalid("truncated header"))?;

        let (header, _): (ArchiveHeader, usize) =
            bincode::serde::decode_from_slice(header_bytes, bincode::config::standard())
                .map_err(|e| ArchiveError::InvalidHeader {
                    reason: e.to_string(),
                })?;

        if header.magic != ARCHIVE_MAGIC {
            return Err(invalid("bad magic bytes"));
        }
        if header.format_version != ARCHIVE_FORMAT_VERSION {
            return Err(ArchiveError::VersionMismatch {
                expected: ARCHIVE_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        let payload = &raw[4 + header_len..];
        let actual = Fingerprint::from_bytes(payload);
        if actual != header.checksum {
            return Err(ArchiveError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let (archive, _): (Archive, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(
                |e| ArchiveError::InvalidHeader {
                    reason: format!("undecodable payload: {e}"),
                },
            )?;
        Ok(archive)
    }

    /// Writes the archive to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ArchiveError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads and validates the archive at `path`.
    pub fn read_from(path: &Path) -> Result<Self, ArchiveError> {
        let raw = std::fs::read(path).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(&raw)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ArchiveError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        ArchiveError::Serialization {
            reason: e.to_string(),
        }
    })
}
