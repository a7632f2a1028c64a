//! Per-file deserialization strategies.

use sigil_config::StrategyName;
use std::fmt;

/// How eagerly a file's top levels are loaded and how much of each is decoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum DeserializationStrategy {
    /// The file is not even indexed until a lookup misses everywhere else.
    OnDemand,
    /// Top levels load when referenced.
    #[default]
    OnlyReferenced,
    /// Every top level loads at module initialization.
    All,
    /// Explicitly exported top levels load at initialization, others when referenced.
    ExplicitlyExported,
    /// Referenced top levels load without any bodies.
    OnlyDeclarationHeaders,
    /// Referenced top levels load without bodies, except inline function bodies.
    WithInlineBodies,
}

impl DeserializationStrategy {
    /// The file is indexed lazily.
    pub fn on_demand(self) -> bool {
        matches!(self, Self::OnDemand)
    }

    /// Function bodies and initializers are decoded.
    pub fn need_bodies(self) -> bool {
        matches!(
            self,
            Self::OnDemand | Self::OnlyReferenced | Self::All | Self::ExplicitlyExported
        )
    }

    /// Explicitly exported top levels are queued at initialization.
    pub fn explicitly_exported(self) -> bool {
        matches!(self, Self::All | Self::ExplicitlyExported)
    }

    /// Every top level is queued at initialization.
    pub fn whole_world(self) -> bool {
        matches!(self, Self::All)
    }

    /// Bodies of inline functions are decoded even when other bodies are not.
    pub fn inline_bodies(self) -> bool {
        !matches!(self, Self::OnlyDeclarationHeaders)
    }

    /// Whether a function body should be decoded under this strategy.
    pub fn loads_body(self, is_inline: bool) -> bool {
        self.need_bodies() || (is_inline && self.inline_bodies())
    }
}

impl From<StrategyName> for DeserializationStrategy {
    fn from(name: StrategyName) -> Self {
        match name {
            StrategyName::All => Self::All,
            StrategyName::Referenced => Self::OnlyReferenced,
            StrategyName::Headers => Self::OnlyDeclarationHeaders,
            StrategyName::InlineBodies => Self::WithInlineBodies,
            StrategyName::OnDemand => Self::OnDemand,
            StrategyName::Exported => Self::ExplicitlyExported,
        }
    }
}

impl fmt::Display for DeserializationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnDemand => "on-demand",
            Self::OnlyReferenced => "referenced",
            Self::All => "all",
            Self::ExplicitlyExported => "exported",
            Self::OnlyDeclarationHeaders => "headers",
            Self::WithInlineBodies => "inline-bodies",
        };
        f.write_str(name)
    }
}

/// Chooses a strategy for each file of a module by file name.
pub type StrategyResolver = Box<dyn Fn(&str) -> DeserializationStrategy>;

/// The same strategy for every file.
pub fn uniform(strategy: DeserializationStrategy) -> StrategyResolver {
    Box::new(move |_| strategy)
}

/// Dirty files load whole, every other file loads headers plus inline bodies.
///
/// Meant for an overlay whose unchanged declarations are already in the
/// program; a fresh session should use [`with_dirty`].
pub fn dirty_files(dirty: Vec<String>) -> StrategyResolver {
    with_dirty(dirty, uniform(DeserializationStrategy::WithInlineBodies))
}

/// Dirty files load whole, every other file keeps the strategy `base` gives it.
pub fn with_dirty(dirty: Vec<String>, base: StrategyResolver) -> StrategyResolver {
    Box::new(move |name| {
        if dirty.iter().any(|d| d == name) {
            DeserializationStrategy::All
        } else {
            base(name)
        }
    })
}
