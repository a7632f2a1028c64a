//! Incremental, signature-addressed IR linker.
//!
//! Loads declarations out of serialized IR archives on demand: only what is
//! reachable from the entry points (or what a file's strategy forces) is
//! ever decoded. References are resolved by signature across a graph of
//! modules, expect declarations are actualized once linking reaches a fixed
//! point, and with partial linkage enabled anything left unresolved is
//! replaced by a stub that fails when used.
//!
//! The entry point is [`Linker`].

#![warn(missing_docs)]

mod actualize;
pub mod builtins;
pub mod codec;
pub mod context;
mod decoder;
pub mod error;
pub mod file;
pub mod linker;
pub mod module;
pub mod options;
pub mod overlay;
mod partial;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use builtins::{FunctionFamily, FunctionTypeModule};
pub use codec::SignatureCodec;
pub use context::{LinkContext, Request, RequestScope};
pub use error::{LinkError, LinkResult};
pub use file::FileState;
pub use linker::{LinkReport, Linker};
pub use module::{ArchiveModule, ModuleDeserializer};
pub use options::LinkOptions;
pub use overlay::{DirtyFile, IncrementalOverlay};
pub use strategy::{DeserializationStrategy, StrategyResolver};
