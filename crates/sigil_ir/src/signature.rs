//! Stable, archive-independent declaration addresses.
//!
//! A [`Signature`] names a declaration (or a constituent of one) by what it
//! is, not by where an archive happens to store it. Every reachability and
//! module-containment decision works on [`Signature::top_level`], the
//! outermost independently loadable projection.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Flag bits carried by public signatures.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SignatureFlags: u64 {
        /// The declaration is a platform-agnostic `expect` declaration.
        const EXPECT = 1 << 0;
        /// The declaration was synthesized by the compiler.
        const SYNTHETIC = 1 << 1;
        /// The declaration comes from a native interop library.
        const INTEROP = 1 << 2;
    }
}

const FLAG_NAMES: [(SignatureFlags, &str); 3] = [
    (SignatureFlags::EXPECT, "expect"),
    (SignatureFlags::SYNTHETIC, "synthetic"),
    (SignatureFlags::INTEROP, "interop"),
];

/// A public signature: package path, dotted declaration path, optional
/// overload discriminator and flag bits.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PublicSignature {
    /// Package path, e.g. `core.collections`. May be empty for the root package.
    pub package: String,
    /// Dot-separated nesting path, e.g. `List.size`.
    pub declaration: String,
    /// Hash distinguishing overloads.
    pub id: Option<u64>,
    /// Flag bits.
    pub flags: SignatureFlags,
}

impl PublicSignature {
    /// Creates a public signature without discriminator or flags.
    pub fn new(package: impl Into<String>, declaration: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            declaration: declaration.into(),
            id: None,
            flags: SignatureFlags::empty(),
        }
    }

    /// Sets the overload discriminator.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Adds flag bits.
    pub fn with_flags(mut self, flags: SignatureFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns `true` if the declaration path has no nesting.
    pub fn is_top_level(&self) -> bool {
        !self.declaration.contains('.')
    }

    /// The last segment of the declaration path.
    pub fn short_name(&self) -> &str {
        self.declaration
            .rsplit('.')
            .next()
            .unwrap_or(&self.declaration)
    }

    /// The outermost declaration: first path segment, no discriminator,
    /// same flags.
    fn top_level(&self) -> PublicSignature {
        match self.declaration.split_once('.') {
            Some((outer, _)) => {
                PublicSignature::new(self.package.clone(), outer).with_flags(self.flags)
            }
            None => self.clone(),
        }
    }
}

impl fmt::Display for PublicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.declaration)?;
        if let Some(id) = self.id {
            write!(f, "|{id:x}")?;
        }
        let mut sep = '#';
        for (flag, name) in FLAG_NAMES {
            if self.flags.contains(flag) {
                write!(f, "{sep}{name}")?;
                sep = '+';
            }
        }
        Ok(())
    }
}

/// Error returned when public signature text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid signature `{input}`: {reason}")]
pub struct ParseSignatureError {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl FromStr for PublicSignature {
    type Err = ParseSignatureError;

    /// Parses `package/decl.path[|hexid][#flag+flag]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseSignatureError {
            input: s.to_string(),
            reason,
        };
        let (package, rest) = s.split_once('/').ok_or_else(|| err("missing `/`"))?;
        let (rest, flags_text) = match rest.split_once('#') {
            Some((rest, flags)) => (rest, Some(flags)),
            None => (rest, None),
        };
        let (declaration, id) = match rest.split_once('|') {
            Some((decl, id)) => {
                let id = u64::from_str_radix(id, 16).map_err(|_| err("bad discriminator"))?;
                (decl, Some(id))
            }
            None => (rest, None),
        };
        if declaration.is_empty() {
            return Err(err("empty declaration path"));
        }
        let mut flags = SignatureFlags::empty();
        if let Some(text) = flags_text {
            for name in text.split('+') {
                let (flag, _) = FLAG_NAMES
                    .iter()
                    .find(|(_, n)| *n == name)
                    .ok_or_else(|| err("unknown flag"))?;
                flags |= *flag;
            }
        }
        Ok(PublicSignature {
            package: package.to_string(),
            declaration: declaration.to_string(),
            id,
            flags,
        })
    }
}

/// A stable identifier for a declaration or one of its constituents.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Signature {
    /// A publicly addressable declaration.
    Public(PublicSignature),
    /// A property accessor: the property plus the accessor's own signature.
    Accessor {
        /// The owning property.
        property: PublicSignature,
        /// The accessor itself.
        accessor: PublicSignature,
    },
    /// A declaration only addressable inside one file.
    FileLocal {
        /// The enclosing signature.
        container: Box<Signature>,
        /// File-unique local id.
        id: u64,
    },
    /// A declaration only addressable inside a lexical scope of one declaration.
    ScopedLocal(u32),
    /// A constituent of another declaration with no signature of its own.
    Composite {
        /// The declaration containing the constituent.
        container: Box<Signature>,
        /// The constituent, relative to the container.
        inner: Box<Signature>,
    },
    /// The file itself.
    File(String),
}

impl Signature {
    /// Shorthand for a public signature.
    pub fn public(package: impl Into<String>, declaration: impl Into<String>) -> Self {
        Signature::Public(PublicSignature::new(package, declaration))
    }

    /// The outermost independently loadable projection of this signature.
    pub fn top_level(&self) -> Signature {
        match self {
            Signature::Public(public) => Signature::Public(public.top_level()),
            Signature::Accessor { property, .. } => Signature::Public(property.top_level()),
            Signature::FileLocal { container, .. } => container.top_level(),
            Signature::ScopedLocal(_) => self.clone(),
            Signature::Composite { container, inner } => match container.as_ref() {
                Signature::File(_) => Signature::Composite {
                    container: container.clone(),
                    inner: Box::new(inner.top_level()),
                },
                _ => container.top_level(),
            },
            Signature::File(_) => self.clone(),
        }
    }

    /// Returns `true` if this signature is its own top-level projection.
    pub fn is_top_level(&self) -> bool {
        self.top_level() == *self
    }

    /// Returns `true` for signatures only valid inside one file or scope.
    pub fn is_local(&self) -> bool {
        match self {
            Signature::FileLocal { .. } | Signature::ScopedLocal(_) => true,
            Signature::Composite { container, .. } => container.is_local(),
            Signature::Public(_) | Signature::Accessor { .. } | Signature::File(_) => false,
        }
    }

    /// Returns `true` if this is a public signature flagged as `expect`.
    pub fn is_expect(&self) -> bool {
        matches!(self, Signature::Public(p) if p.flags.contains(SignatureFlags::EXPECT))
    }

    /// Returns the public part of a public signature.
    pub fn as_public(&self) -> Option<&PublicSignature> {
        match self {
            Signature::Public(p) => Some(p),
            _ => None,
        }
    }

    /// The package path, if this signature has one.
    pub fn package(&self) -> Option<&str> {
        match self {
            Signature::Public(p) => Some(&p.package),
            Signature::Accessor { property, .. } => Some(&property.package),
            Signature::FileLocal { container, .. } | Signature::Composite { container, .. } => {
                container.package()
            }
            Signature::ScopedLocal(_) | Signature::File(_) => None,
        }
    }
}

impl From<PublicSignature> for Signature {
    fn from(public: PublicSignature) -> Self {
        Signature::Public(public)
    }
}

impl FromStr for Signature {
    type Err = ParseSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<PublicSignature>().map(Signature::Public)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Public(p) => write!(f, "{p}"),
            Signature::Accessor { property, accessor } => write!(f, "{property}::{accessor}"),
            Signature::FileLocal { container, id } => write!(f, "{container}:local#{id}"),
            Signature::ScopedLocal(id) => write!(f, "#{id}"),
            Signature::Composite { container, inner } => write!(f, "{container}/{inner}"),
            Signature::File(name) => write!(f, "<{name}>"),
        }
    }
}
