//! Types as they appear in linked declarations and expressions.

use crate::ids::SymbolId;
use serde::{Deserialize, Serialize};

/// Use-site variance of a type argument or declaration-site variance of a type parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Variance {
    /// No variance annotation.
    Invariant,
    /// Contravariant (`in`).
    In,
    /// Covariant (`out`).
    Out,
}

/// A type argument.
#[derive(Clone, PartialEq, Debug)]
pub enum TypeArgument {
    /// The star projection.
    Star,
    /// A projected type.
    Projection {
        /// Use-site variance.
        variance: Variance,
        /// The argument type.
        ty: IrType,
    },
}

/// A linked type.
///
/// Classifiers are referenced through symbols, so a type may name a class or
/// type parameter that is only materialized later, or never (a stub).
#[derive(Clone, PartialEq, Debug)]
pub enum IrType {
    /// A classifier applied to arguments.
    Simple {
        /// The class or type parameter symbol.
        classifier: SymbolId,
        /// Type arguments.
        arguments: Vec<TypeArgument>,
        /// Whether `null` is a value of this type.
        nullable: bool,
    },
    /// The dynamic type.
    Dynamic,
    /// A type that failed to resolve.
    Error,
}

impl IrType {
    /// A non-null classifier type without arguments.
    pub fn simple(classifier: SymbolId) -> Self {
        IrType::Simple {
            classifier,
            arguments: Vec::new(),
            nullable: false,
        }
    }

    /// Returns the classifier symbol of a simple type.
    pub fn classifier(&self) -> Option<SymbolId> {
        match self {
            IrType::Simple { classifier, .. } => Some(*classifier),
            IrType::Dynamic | IrType::Error => None,
        }
    }
}
