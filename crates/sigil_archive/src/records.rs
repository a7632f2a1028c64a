//! The record schema of archive tables.
//!
//! Records refer to each other by table index: `u32` fields named after a
//! table (`name`, `signature`, `ty`, `body`) index the strings, signatures,
//! types and bodies tables of the same file. Nested declarations and
//! expressions are stored inline. Every union carries an `Unset` variant
//! that a well-formed encoder never writes; decoders treat it as corruption.

use crate::error::ArchiveError;
use crate::table::TableKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sigil_ir::decl::ClassKind;
use sigil_ir::expr::{LoopKind, TypeOperator};
use sigil_ir::symbol::SymbolKind;
use sigil_ir::types::Variance;

/// Index into the strings table.
pub type StringIndex = u32;
/// Index into the signatures table.
pub type SignatureIndex = u32;
/// Index into the types table.
pub type TypeIndex = u32;
/// Index into the bodies table.
pub type BodyIndex = u32;

/// A signature record.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SignatureRecord {
    /// A public signature.
    Public {
        /// Package path.
        package: StringIndex,
        /// Dotted declaration path.
        declaration: StringIndex,
        /// Overload discriminator.
        id: Option<u64>,
        /// Raw flag bits.
        flags: u64,
    },
    /// A property accessor; both halves must decode to public signatures.
    Accessor {
        /// The property signature.
        property: SignatureIndex,
        /// The accessor signature.
        accessor: SignatureIndex,
    },
    /// A file-local signature.
    FileLocal {
        /// Enclosing signature.
        container: SignatureIndex,
        /// File-unique id.
        local_id: u64,
    },
    /// A scoped-local signature.
    ScopedLocal {
        /// Scope-unique id.
        local_id: u32,
    },
    /// A constituent of another declaration.
    Composite {
        /// Container signature.
        container: SignatureIndex,
        /// Inner signature.
        inner: SignatureIndex,
    },
    /// A file signature.
    File {
        /// File name.
        name: StringIndex,
    },
    /// Not written by well-formed encoders.
    Unset,
}

/// A reference to a symbol: the expected kind plus the signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SymbolRef {
    /// Kind expected at the use site.
    pub kind: SymbolKind,
    /// Signature of the referenced declaration.
    pub signature: SignatureIndex,
}

/// A type argument record.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TypeArgumentRecord {
    /// Star projection.
    Star,
    /// Projected type.
    Projection {
        /// Use-site variance.
        variance: Variance,
        /// Argument type.
        ty: TypeIndex,
    },
}

/// A type record.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TypeRecord {
    /// A classifier type.
    Simple {
        /// Class or type parameter symbol.
        classifier: SymbolRef,
        /// Type arguments.
        arguments: Vec<TypeArgumentRecord>,
        /// Nullability.
        nullable: bool,
    },
    /// The dynamic type.
    Dynamic,
    /// An unresolved type.
    Error,
    /// Not written by well-formed encoders.
    Unset,
}

/// A declaration record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DeclRecord {
    /// Symbol the declaration binds.
    pub symbol: SymbolRef,
    /// Declared name.
    pub name: StringIndex,
    /// Start offset.
    pub start: i32,
    /// End offset.
    pub end: i32,
    /// Index into the debug-info table.
    pub debug_info: Option<u32>,
    /// Kind-specific payload.
    pub kind: DeclKindRecord,
}

/// Function and constructor payload.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Type parameters.
    pub type_parameters: Vec<DeclRecord>,
    /// Value parameters.
    pub value_parameters: Vec<DeclRecord>,
    /// Return type.
    pub return_type: TypeIndex,
    /// Body.
    pub body: Option<BodyIndex>,
    /// Declared `inline`.
    pub is_inline: bool,
    /// Declared `suspend`.
    pub is_suspend: bool,
    /// Declared `expect`.
    pub is_expect: bool,
}

/// Kind-specific declaration payload.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum DeclKindRecord {
    /// A class.
    Class {
        /// Class flavour.
        class_kind: ClassKind,
        /// Type parameters.
        type_parameters: Vec<DeclRecord>,
        /// Supertypes.
        supertypes: Vec<TypeIndex>,
        /// Members.
        members: Vec<DeclRecord>,
        /// Declared `expect`.
        is_expect: bool,
    },
    /// A function.
    Function(FunctionRecord),
    /// A constructor.
    Constructor(FunctionRecord),
    /// A property.
    Property {
        /// Getter.
        getter: Option<Box<DeclRecord>>,
        /// Setter.
        setter: Option<Box<DeclRecord>>,
        /// Backing field.
        backing_field: Option<Box<DeclRecord>>,
        /// Declared `var`.
        is_var: bool,
        /// Declared `expect`.
        is_expect: bool,
    },
    /// A backing field.
    Field {
        /// Field type.
        ty: TypeIndex,
        /// Initializer body.
        initializer: Option<BodyIndex>,
    },
    /// An enum entry.
    EnumEntry {
        /// Initializer body.
        initializer: Option<BodyIndex>,
    },
    /// A type alias.
    TypeAlias {
        /// Type parameters.
        type_parameters: Vec<DeclRecord>,
        /// Aliased type.
        expanded: TypeIndex,
    },
    /// A type parameter.
    TypeParameter {
        /// Position.
        index: u32,
        /// Variance.
        variance: Variance,
        /// Upper bounds.
        bounds: Vec<TypeIndex>,
    },
    /// A value parameter.
    ValueParameter {
        /// Position.
        index: u32,
        /// Type.
        ty: TypeIndex,
        /// Default value body.
        default_value: Option<BodyIndex>,
        /// Declared `vararg`.
        is_vararg: bool,
    },
    /// A local variable.
    Variable {
        /// Type.
        ty: TypeIndex,
        /// Inline initializer.
        initializer: Option<Box<ExprRecord>>,
        /// Declared `var`.
        is_var: bool,
    },
    /// Not written by well-formed encoders.
    Unset,
}

/// A body record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum BodyRecord {
    /// Expression body.
    Expression(ExprRecord),
    /// Block body.
    Block(Vec<StatementRecord>),
    /// Not written by well-formed encoders.
    Unset,
}

/// A statement record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum StatementRecord {
    /// Expression statement.
    Expr(ExprRecord),
    /// Local declaration.
    Decl(DeclRecord),
    /// Not written by well-formed encoders.
    Unset,
}

/// A constant record. Floats are stored as raw bits.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ConstRecord {
    /// `null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// UTF-16 code unit.
    Char(u16),
    /// 8-bit integer.
    Byte(i8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float bits.
    Float(u32),
    /// 64-bit float bits.
    Double(u64),
    /// String literal.
    String(StringIndex),
    /// Not written by well-formed encoders.
    Unset,
}

/// A `when` branch record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Condition.
    pub condition: ExprRecord,
    /// Result.
    pub result: ExprRecord,
}

/// A `catch` clause record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CatchRecord {
    /// The caught variable declaration.
    pub parameter: DeclRecord,
    /// Handler.
    pub result: ExprRecord,
}

/// An expression record.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ExprRecord {
    /// Expression type.
    pub ty: TypeIndex,
    /// Start offset.
    pub start: i32,
    /// End offset.
    pub end: i32,
    /// The operation.
    pub operation: OperationRecord,
}

/// Expression operations.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum OperationRecord {
    /// Literal.
    Const(ConstRecord),
    /// Statement block.
    Block(Vec<StatementRecord>),
    /// Call.
    Call {
        /// Callee.
        callee: SymbolRef,
        /// Dispatch receiver.
        receiver: Option<Box<ExprRecord>>,
        /// Type arguments.
        type_arguments: Vec<TypeIndex>,
        /// Value arguments; `None` means default.
        arguments: Vec<Option<ExprRecord>>,
    },
    /// Constructor call.
    ConstructorCall {
        /// Constructor.
        constructor: SymbolRef,
        /// Type arguments.
        type_arguments: Vec<TypeIndex>,
        /// Value arguments.
        arguments: Vec<Option<ExprRecord>>,
    },
    /// Function reference.
    FunctionReference {
        /// Target.
        target: SymbolRef,
        /// Type arguments.
        type_arguments: Vec<TypeIndex>,
    },
    /// Property reference.
    PropertyReference {
        /// Target.
        target: SymbolRef,
    },
    /// Read of a value.
    GetValue {
        /// Read symbol.
        symbol: SymbolRef,
    },
    /// Write of a variable.
    SetValue {
        /// Written symbol.
        symbol: SymbolRef,
        /// Value.
        value: Box<ExprRecord>,
    },
    /// Field read.
    GetField {
        /// Field.
        field: SymbolRef,
        /// Receiver.
        receiver: Option<Box<ExprRecord>>,
    },
    /// Field write.
    SetField {
        /// Field.
        field: SymbolRef,
        /// Receiver.
        receiver: Option<Box<ExprRecord>>,
        /// Value.
        value: Box<ExprRecord>,
    },
    /// Object read.
    GetObject {
        /// Object class.
        symbol: SymbolRef,
    },
    /// Enum entry read.
    GetEnumValue {
        /// Entry.
        symbol: SymbolRef,
    },
    /// Return.
    Return {
        /// Function returned from.
        target: SymbolRef,
        /// Value.
        value: Box<ExprRecord>,
    },
    /// Conditional.
    When {
        /// Branches in order.
        branches: Vec<BranchRecord>,
    },
    /// Loop. `loop_id` is unique within the file.
    Loop {
        /// In-file loop id.
        loop_id: i32,
        /// Loop flavour.
        kind: LoopKind,
        /// Label.
        label: Option<StringIndex>,
        /// Condition.
        condition: Box<ExprRecord>,
        /// Body.
        body: Option<Box<ExprRecord>>,
    },
    /// Loop exit.
    Break {
        /// In-file loop id.
        loop_id: i32,
    },
    /// Loop continue.
    Continue {
        /// In-file loop id.
        loop_id: i32,
    },
    /// Throw.
    Throw {
        /// Thrown value.
        value: Box<ExprRecord>,
    },
    /// Type operator.
    TypeOp {
        /// Operator.
        operator: TypeOperator,
        /// Operand type.
        operand: TypeIndex,
        /// Argument.
        argument: Box<ExprRecord>,
    },
    /// String concatenation.
    StringConcat {
        /// Parts.
        parts: Vec<ExprRecord>,
    },
    /// Try.
    Try {
        /// Body.
        body: Box<ExprRecord>,
        /// Catch clauses.
        catches: Vec<CatchRecord>,
        /// Finally block.
        finally: Option<Box<ExprRecord>>,
    },
    /// Vararg.
    Vararg {
        /// Elements.
        elements: Vec<ExprRecord>,
    },
    /// Not written by well-formed encoders.
    Unset,
}

/// Encodes a record with the archive's bincode configuration.
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>, ArchiveError> {
    bincode::serde::encode_to_vec(record, bincode::config::standard()).map_err(|e| {
        ArchiveError::Serialization {
            reason: e.to_string(),
        }
    })
}

/// Decodes a record, rejecting trailing bytes.
pub fn decode_record<T: DeserializeOwned>(
    bytes: &[u8],
    table: TableKind,
    index: u32,
) -> Result<T, ArchiveError> {
    let malformed = |reason: String| ArchiveError::MalformedRecord {
        table,
        index,
        reason,
    };
    let (record, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| malformed(e.to_string()))?;
    if read != bytes.len() {
        return Err(malformed(format!(
            "{} trailing bytes after record",
            bytes.len() - read
        )));
    }
    Ok(record)
}
