//! Link errors and their diagnostic codes.

use sigil_archive::ArchiveError;
use sigil_common::InternalError;
use sigil_diagnostics::{Category, Diagnostic, DiagnosticCode, Origin};
use sigil_ir::symbol::SymbolKind;

/// Result type of linker operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// `E300`: a signature no module can supply.
pub fn signature_not_found_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Error, 300)
}

/// `E301`: a symbol used with the wrong kind.
pub fn kind_mismatch_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Error, 301)
}

/// `E302`: archive format corruption.
pub fn format_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Error, 302)
}

/// `E303`: a symbol that stayed unbound after linking.
pub fn unbound_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Error, 303)
}

/// `E304`: driver misuse.
pub fn usage_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Error, 304)
}

/// `W300`: an unlinked symbol was replaced by a stub.
pub fn stubbed_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Warning, 300)
}

/// `W301`: a kind mismatch was resolved by substituting a fresh symbol.
pub fn kind_substituted_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Warning, 301)
}

/// `W302`: an expect/actual pair could not be actualized.
pub fn expect_actual_skipped_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Warning, 302)
}

/// `W303`: a top level is declared by more than one module.
pub fn duplicate_signature_code() -> DiagnosticCode {
    DiagnosticCode::new(Category::Warning, 303)
}

/// Errors that abort linking.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A record does not follow the archive schema.
    #[error("malformed archive{}: {reason}", at(.location))]
    Format {
        /// Where the record was read.
        location: Origin,
        /// What was wrong.
        reason: String,
    },

    /// Reading a record from its table failed.
    #[error("archive error{}: {source}", at(.location))]
    Archive {
        /// Where the record was read.
        location: Origin,
        /// The archive-level error.
        #[source]
        source: ArchiveError,
    },

    /// No module in the requesting module's dependency closure supplies a signature.
    #[error(
        "signature `{signature}` not found in module `{module}` or its dependencies (loaded modules: {})",
        .loaded.join(", ")
    )]
    SignatureNotFound {
        /// The missing signature.
        signature: String,
        /// The module whose code referenced it.
        module: String,
        /// Every module registered with the linker.
        loaded: Vec<String>,
    },

    /// A symbol is used or declared with a kind other than the registered one.
    #[error("`{signature}` is a {found}, but a {expected} was expected{}", at(.location))]
    KindMismatch {
        /// The signature involved.
        signature: String,
        /// Kind required at the use or declaration site.
        expected: SymbolKind,
        /// Kind already registered.
        found: SymbolKind,
        /// Where the mismatch was detected.
        location: Origin,
    },

    /// The driver called the linker incorrectly.
    #[error("{0}")]
    Usage(String),

    /// A module name has no registered deserializer.
    #[error("no deserializer for module `{module}`{}", .signature.as_ref().map(|s| format!(" (needed for `{s}`)")).unwrap_or_default())]
    NoDeserializerForModule {
        /// The module name.
        module: String,
        /// The signature that was being resolved.
        signature: Option<String>,
    },

    /// A module name was registered twice.
    #[error("module `{0}` registered twice")]
    DuplicateModule(String),

    /// A symbol stayed unbound after linking without partial linkage.
    #[error("`{signature}` is referenced but was never declared{}", at(.location))]
    Unbound {
        /// The unbound signature.
        signature: String,
        /// The module claiming its top level, when known.
        location: Origin,
    },

    /// A linker bug.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

fn at(location: &Origin) -> String {
    if location.is_empty() {
        String::new()
    } else {
        format!(" ({location})")
    }
}

impl From<ArchiveError> for LinkError {
    fn from(source: ArchiveError) -> Self {
        LinkError::Archive {
            location: Origin::default(),
            source,
        }
    }
}

impl LinkError {
    /// A format error without location.
    pub fn format(reason: impl Into<String>) -> Self {
        LinkError::Format {
            location: Origin::default(),
            reason: reason.into(),
        }
    }

    /// Records the file the error was detected in, unless already known.
    pub fn in_file(mut self, file: &str) -> Self {
        if let Some(location) = self.location_mut() {
            if location.file.is_none() {
                location.file = Some(file.to_string());
            }
        }
        self
    }

    /// Records the module the error was detected in, unless already known.
    pub fn in_module(mut self, module: &str) -> Self {
        if let Some(location) = self.location_mut() {
            if location.module.is_none() {
                location.module = Some(module.to_string());
            }
        }
        self
    }

    fn location_mut(&mut self) -> Option<&mut Origin> {
        match self {
            LinkError::Format { location, .. }
            | LinkError::Archive { location, .. }
            | LinkError::KindMismatch { location, .. }
            | LinkError::Unbound { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LinkError::Format { .. } | LinkError::Archive { .. } => format_code(),
            LinkError::SignatureNotFound { .. } => signature_not_found_code(),
            LinkError::KindMismatch { .. } => kind_mismatch_code(),
            LinkError::Unbound { .. } => unbound_code(),
            LinkError::Usage(_)
            | LinkError::NoDeserializerForModule { .. }
            | LinkError::DuplicateModule(_)
            | LinkError::Internal(_) => usage_code(),
        }
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            LinkError::Format { location, .. }
            | LinkError::Archive { location, .. }
            | LinkError::KindMismatch { location, .. }
            | LinkError::Unbound { location, .. } => {
                diag = diag.with_origin(location.clone());
            }
            LinkError::SignatureNotFound { module, .. } => {
                diag = diag
                    .with_origin(Origin::module(module.clone()))
                    .with_help("enable partial linkage to replace missing declarations with stubs");
            }
            _ => {}
        }
        if matches!(self, LinkError::Format { .. } | LinkError::Archive { .. }) {
            diag = diag.with_note("the archive was probably written by an incompatible producer");
        }
        diag
    }
}
