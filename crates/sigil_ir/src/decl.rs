//! Declarations materialized by the linker.

use crate::expr::{Coordinates, Expr, Statement};
use crate::ids::{DeclId, FileId, SymbolId};
use crate::types::{IrType, Variance};
use serde::{Deserialize, Serialize};
use sigil_common::Ident;

/// How a declaration came to exist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeclOrigin {
    /// Decoded from an archive.
    Deserialized,
    /// Supplied by the front end as a freshly compiled in-memory declaration.
    InMemory,
    /// Synthesized by a virtual module.
    Synthesized,
    /// A runtime-failing stand-in for a declaration that could not be linked.
    UnlinkedStub,
}

/// A function body.
#[derive(Clone, PartialEq, Debug)]
pub enum Body {
    /// Expression body.
    Expression(Expr),
    /// Block body.
    Block(Vec<Statement>),
}

/// Class flavours.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassKind {
    /// A class.
    Class,
    /// An interface.
    Interface,
    /// An enum class.
    EnumClass,
    /// A singleton object.
    Object,
    /// An annotation class.
    AnnotationClass,
}

/// Class-specific data.
#[derive(Clone, PartialEq, Debug)]
pub struct ClassDecl {
    /// Class flavour.
    pub class_kind: ClassKind,
    /// Type parameters.
    pub type_parameters: Vec<DeclId>,
    /// Direct supertypes.
    pub supertypes: Vec<IrType>,
    /// Member declarations.
    pub members: Vec<DeclId>,
    /// Declared `expect`.
    pub is_expect: bool,
}

/// Data shared by functions and constructors.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDecl {
    /// Type parameters.
    pub type_parameters: Vec<DeclId>,
    /// Value parameters, in order.
    pub value_parameters: Vec<DeclId>,
    /// Return type.
    pub return_type: IrType,
    /// Body, when loaded.
    pub body: Option<Body>,
    /// Declared `inline`; its body is needed by callers in other modules.
    pub is_inline: bool,
    /// Declared `suspend`.
    pub is_suspend: bool,
    /// Declared `expect`.
    pub is_expect: bool,
}

/// Property-specific data.
#[derive(Clone, PartialEq, Debug)]
pub struct PropertyDecl {
    /// Getter function.
    pub getter: Option<DeclId>,
    /// Setter function.
    pub setter: Option<DeclId>,
    /// Backing field.
    pub backing_field: Option<DeclId>,
    /// Declared `var`.
    pub is_var: bool,
    /// Declared `expect`.
    pub is_expect: bool,
}

/// Field-specific data.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldDecl {
    /// Field type.
    pub ty: IrType,
    /// Initializer, when loaded.
    pub initializer: Option<Expr>,
}

/// Declaration forms.
#[derive(Clone, PartialEq, Debug)]
pub enum DeclKind {
    /// A class, interface or object.
    Class(ClassDecl),
    /// A function.
    Function(FunctionDecl),
    /// A constructor.
    Constructor(FunctionDecl),
    /// A property.
    Property(PropertyDecl),
    /// A backing field.
    Field(FieldDecl),
    /// An enum entry.
    EnumEntry {
        /// Entry initializer, when loaded.
        initializer: Option<Expr>,
    },
    /// A type alias.
    TypeAlias {
        /// Type parameters.
        type_parameters: Vec<DeclId>,
        /// The aliased type.
        expanded: IrType,
    },
    /// A type parameter.
    TypeParameter {
        /// Position in the owner's type parameter list.
        index: u32,
        /// Declaration-site variance.
        variance: Variance,
        /// Upper bounds.
        bounds: Vec<IrType>,
    },
    /// A value parameter.
    ValueParameter {
        /// Position in the owner's parameter list.
        index: u32,
        /// Parameter type.
        ty: IrType,
        /// Default value expression.
        default_value: Option<Expr>,
        /// Declared `vararg`.
        is_vararg: bool,
    },
    /// A local variable.
    Variable {
        /// Variable type.
        ty: IrType,
        /// Initializer.
        initializer: Option<Expr>,
        /// Declared `var`.
        is_var: bool,
    },
}

impl DeclKind {
    /// Returns function data for functions and constructors.
    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match self {
            DeclKind::Function(f) | DeclKind::Constructor(f) => Some(f),
            _ => None,
        }
    }

    /// Mutable variant of [`as_function`](Self::as_function).
    pub fn as_function_mut(&mut self) -> Option<&mut FunctionDecl> {
        match self {
            DeclKind::Function(f) | DeclKind::Constructor(f) => Some(f),
            _ => None,
        }
    }
}

/// A materialized declaration.
#[derive(Clone, PartialEq, Debug)]
pub struct Declaration {
    /// The symbol bound to this declaration.
    pub symbol: SymbolId,
    /// Declared name.
    pub name: Ident,
    /// What kind of declaration this is.
    pub kind: DeclKind,
    /// Enclosing declaration, `None` for top levels.
    pub parent: Option<DeclId>,
    /// File the declaration lives in.
    pub file: Option<FileId>,
    /// How the declaration came to exist.
    pub origin: DeclOrigin,
    /// Source offsets.
    pub coordinates: Coordinates,
    /// Debug name from the archive's debug-info table.
    pub debug_name: Option<String>,
}

impl Declaration {
    /// Creates a top-level declaration with default metadata.
    pub fn new(symbol: SymbolId, name: Ident, kind: DeclKind, origin: DeclOrigin) -> Self {
        Self {
            symbol,
            name,
            kind,
            parent: None,
            file: None,
            origin,
            coordinates: Coordinates::default(),
            debug_name: None,
        }
    }
}
