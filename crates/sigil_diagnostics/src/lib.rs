//! Diagnostic creation, severity management, and rendering for the linker.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels,
//! error codes and an optional link [`Origin`] naming the module and file
//! involved. The thread-safe [`DiagnosticSink`] accumulates diagnostics during
//! linking, and [`DiagnosticRenderer`] implementations format them for the
//! terminal or as JSON lines.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode, ParseCodeError};
pub use diagnostic::{Diagnostic, Origin};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::{Severity, SeverityCounts};
pub use sink::DiagnosticSink;
