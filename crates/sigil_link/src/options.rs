//! Link options.

use crate::error::{LinkError, LinkResult};
use crate::strategy::DeserializationStrategy;
use sigil_config::{LinkConfig, PartialLinkageLog};
use sigil_diagnostics::Severity;
use sigil_ir::signature::{PublicSignature, Signature};

/// Default limit on nested declaration and expression records.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options of one linking session.
#[derive(Clone, Debug)]
pub struct LinkOptions {
    /// Replace unresolvable references with stubs instead of failing.
    pub partial_linkage: bool,
    /// How partial-linkage events are reported.
    pub partial_linkage_log: PartialLinkageLog,
    /// Strategy for files without an explicit one.
    pub default_strategy: DeserializationStrategy,
    /// Maximum record nesting before the archive is considered corrupt.
    pub max_depth: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            partial_linkage: false,
            partial_linkage_log: PartialLinkageLog::Warning,
            default_strategy: DeserializationStrategy::OnlyReferenced,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LinkOptions {
    /// Builds options from a loaded configuration.
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            partial_linkage: config.link.partial_linkage,
            partial_linkage_log: config.link.partial_linkage_log,
            default_strategy: config.link.default_strategy.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Severity of partial-linkage diagnostics; `None` when they are silenced.
    pub fn partial_linkage_severity(&self) -> Option<Severity> {
        match self.partial_linkage_log {
            PartialLinkageLog::Silent => None,
            PartialLinkageLog::Info => Some(Severity::Note),
            PartialLinkageLog::Warning => Some(Severity::Warning),
            PartialLinkageLog::Error => Some(Severity::Error),
        }
    }
}

/// Parses the text form of a public signature from configuration.
pub fn parse_signature(text: &str) -> LinkResult<Signature> {
    text.parse::<PublicSignature>()
        .map(Signature::Public)
        .map_err(|e| LinkError::Usage(format!("invalid signature in configuration: {e}")))
}

/// Parses the configured entry signatures.
pub fn entry_signatures(config: &LinkConfig) -> LinkResult<Vec<Signature>> {
    config.link.entry.iter().map(|s| parse_signature(s)).collect()
}

/// Parses the configured expect/actual pairs.
pub fn expect_actual_pairs(config: &LinkConfig) -> LinkResult<Vec<(Signature, Signature)>> {
    config
        .expect_actual
        .iter()
        .map(|(e, a)| Ok((parse_signature(e)?, parse_signature(a)?)))
        .collect()
}
