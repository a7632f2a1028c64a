//! Shared foundational types used across the Sigil IR linker.
//!
//! This crate provides interned identifiers, 128-bit content fingerprints,
//! and the common internal-error result type.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod ident;
pub mod result;

pub use fingerprint::{Fingerprint, FingerprintBuilder, ParseFingerprintError};
pub use ident::{Ident, Interner};
pub use result::{InternalError, SigilResult};
