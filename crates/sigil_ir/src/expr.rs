//! Expressions, statements and loops of linked function bodies.

use crate::const_value::ConstValue;
use crate::ids::{DeclId, LoopId, SymbolId};
use crate::types::IrType;
use serde::{Deserialize, Serialize};

/// Start and end offsets of an element in its source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Coordinates {
    /// Start offset.
    pub start: i32,
    /// End offset.
    pub end: i32,
}

impl Coordinates {
    /// Creates coordinates from offsets.
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }
}

/// A typed expression.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    /// The expression's type.
    pub ty: IrType,
    /// Source offsets.
    pub coordinates: Coordinates,
    /// What the expression does.
    pub kind: ExprKind,
}

impl Expr {
    /// Creates an expression without source offsets.
    pub fn new(ty: IrType, kind: ExprKind) -> Self {
        Self {
            ty,
            coordinates: Coordinates::default(),
            kind,
        }
    }
}

/// Type operators applied by [`ExprKind::TypeOp`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TypeOperator {
    /// Checked cast.
    Cast,
    /// Cast yielding `null` on failure.
    SafeCast,
    /// Instance check.
    InstanceOf,
    /// Negated instance check.
    NotInstanceOf,
    /// Implicit coercion to unit.
    ImplicitCoercionToUnit,
}

/// Loop flavours.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LoopKind {
    /// Condition checked before each iteration.
    While,
    /// Condition checked after each iteration.
    DoWhile,
}

/// A loop. Lives in the program's loop arena so that `break`/`continue`
/// inside the body can refer to it by [`LoopId`].
#[derive(Clone, PartialEq, Debug)]
pub struct Loop {
    /// Loop flavour.
    pub kind: LoopKind,
    /// Optional label.
    pub label: Option<String>,
    /// Loop condition. `None` only while the loop is being decoded.
    pub condition: Option<Expr>,
    /// Loop body.
    pub body: Option<Expr>,
}

/// One `when` branch.
#[derive(Clone, PartialEq, Debug)]
pub struct Branch {
    /// Branch condition.
    pub condition: Expr,
    /// Value if taken.
    pub result: Expr,
}

/// One `catch` clause.
#[derive(Clone, PartialEq, Debug)]
pub struct Catch {
    /// The caught exception variable.
    pub parameter: DeclId,
    /// Handler body.
    pub result: Expr,
}

/// A statement inside a block.
#[derive(Clone, PartialEq, Debug)]
pub enum Statement {
    /// An expression statement.
    Expr(Expr),
    /// A local declaration.
    Decl(DeclId),
}

/// Expression forms.
#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    /// A literal.
    Const(ConstValue),
    /// A statement block.
    Block(Vec<Statement>),
    /// A function call.
    Call {
        /// Called function.
        callee: SymbolId,
        /// Dispatch receiver for member calls.
        receiver: Option<Box<Expr>>,
        /// Explicit type arguments.
        type_arguments: Vec<IrType>,
        /// Value arguments; `None` means "use the default".
        arguments: Vec<Option<Expr>>,
    },
    /// A constructor call.
    ConstructorCall {
        /// Called constructor.
        constructor: SymbolId,
        /// Explicit type arguments.
        type_arguments: Vec<IrType>,
        /// Value arguments; `None` means "use the default".
        arguments: Vec<Option<Expr>>,
    },
    /// A callable reference to a function.
    FunctionReference {
        /// Referenced function.
        target: SymbolId,
        /// Bound type arguments.
        type_arguments: Vec<IrType>,
    },
    /// A callable reference to a property.
    PropertyReference {
        /// Referenced property.
        target: SymbolId,
    },
    /// Reads a parameter or variable.
    GetValue(SymbolId),
    /// Writes a variable.
    SetValue {
        /// Written variable.
        target: SymbolId,
        /// New value.
        value: Box<Expr>,
    },
    /// Reads a field.
    GetField {
        /// Read field.
        field: SymbolId,
        /// Receiver, absent for static fields.
        receiver: Option<Box<Expr>>,
    },
    /// Writes a field.
    SetField {
        /// Written field.
        field: SymbolId,
        /// Receiver, absent for static fields.
        receiver: Option<Box<Expr>>,
        /// New value.
        value: Box<Expr>,
    },
    /// Reads an object instance.
    GetObject(SymbolId),
    /// Reads an enum entry.
    GetEnumValue(SymbolId),
    /// Returns from a function.
    Return {
        /// Function returned from.
        target: SymbolId,
        /// Returned value.
        value: Box<Expr>,
    },
    /// A conditional with ordered branches.
    When(Vec<Branch>),
    /// A loop.
    Loop(LoopId),
    /// Exits a loop.
    Break(LoopId),
    /// Continues a loop.
    Continue(LoopId),
    /// Throws a value.
    Throw(Box<Expr>),
    /// A cast or type check.
    TypeOp {
        /// Operator.
        operator: TypeOperator,
        /// Operand type.
        operand: IrType,
        /// Checked value.
        argument: Box<Expr>,
    },
    /// String template concatenation.
    StringConcat(Vec<Expr>),
    /// `try`/`catch`/`finally`.
    Try {
        /// Protected body.
        body: Box<Expr>,
        /// Catch clauses.
        catches: Vec<Catch>,
        /// Finally block.
        finally: Option<Box<Expr>>,
    },
    /// Vararg argument list.
    Vararg(Vec<Expr>),
    /// Raises a linkage error at run time. Produced for unlinked code paths.
    LinkageError(String),
}
