//! The linked intermediate representation produced by the Sigil linker.
//!
//! This crate defines [`Signature`], the stable archive-independent address of
//! a declaration, the global [`SymbolTable`] that maps signatures to symbols
//! (including delegating symbols used for expect/actual retargeting), and the
//! [`Program`] store holding every materialized declaration, expression and
//! loop. Later compiler stages consume a fully linked [`Program`].

#![warn(missing_docs)]

pub mod arena;
pub mod const_value;
pub mod decl;
pub mod dump;
pub mod expr;
pub mod ids;
pub mod program;
pub mod signature;
pub mod symbol;
pub mod types;
pub mod visit;

pub use arena::{Arena, ArenaId};
pub use const_value::ConstValue;
pub use decl::{
    Body, ClassDecl, ClassKind, DeclKind, DeclOrigin, Declaration, FieldDecl, FunctionDecl,
    PropertyDecl,
};
pub use dump::IrDumper;
pub use expr::{Branch, Catch, Coordinates, Expr, ExprKind, Loop, LoopKind, Statement, TypeOperator};
pub use ids::{DeclId, FileId, LoopId, ModuleId, SymbolId};
pub use program::{IrFile, IrModule, Program};
pub use signature::{ParseSignatureError, PublicSignature, Signature, SignatureFlags};
pub use symbol::{KindConflict, SymbolData, SymbolKind, SymbolOrigin, SymbolOwner, SymbolTable};
pub use types::{IrType, TypeArgument, Variance};
