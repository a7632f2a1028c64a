//! How serious a link diagnostic is, and per-link tallies of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a link diagnostic, least severe first.
///
/// Partial linkage reports unlinked symbols at whichever of these levels the
/// configuration asks for, so a stub can surface as a note, a warning or an
/// error without changing the linked program.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never affects the exit status.
    Note,
    /// Something was patched over but the link succeeded.
    Warning,
    /// The link as a whole fails.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of diagnostics seen at each severity.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SeverityCounts {
    /// Notes.
    pub notes: usize,
    /// Warnings.
    pub warnings: usize,
    /// Errors.
    pub errors: usize,
}

impl SeverityCounts {
    /// Counts one more diagnostic of `severity`.
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Note => self.notes += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }
    }

    /// The most severe level seen, if any.
    pub fn worst(&self) -> Option<Severity> {
        if self.errors > 0 {
            Some(Severity::Error)
        } else if self.warnings > 0 {
            Some(Severity::Warning)
        } else if self.notes > 0 {
            Some(Severity::Note)
        } else {
            None
        }
    }
}

impl FromIterator<Severity> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        let mut counts = SeverityCounts::default();
        for severity in iter {
            counts.add(severity);
        }
        counts
    }
}

/// Renders as `2 errors, 1 warning`; notes are left out.
impl fmt::Display for SeverityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(f, "{} error{}", self.errors, plural(self.errors))?;
        if self.warnings > 0 {
            write!(f, ", {} warning{}", self.warnings, plural(self.warnings))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_levels_are_ordered() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Warning.max(Severity::Note), Severity::Warning);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Note).unwrap(), "\"note\"");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn counts_and_summary() {
        let counts: SeverityCounts =
            [Severity::Warning, Severity::Note, Severity::Error, Severity::Error].into_iter().collect();
        assert_eq!(counts.errors, 2);
        assert_eq!(counts.worst(), Some(Severity::Error));
        assert_eq!(counts.to_string(), "2 errors, 1 warning");

        let clean = SeverityCounts::default();
        assert_eq!(clean.worst(), None);
        assert_eq!(clean.to_string(), "0 errors");
    }
}
