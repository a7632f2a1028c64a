//! Literal constants.

/// A literal constant embedded in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// The `null` literal.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A UTF-16 code unit widened to `char` where valid.
    Char(char),
    /// An 8-bit integer.
    Byte(i8),
    /// A 16-bit integer.
    Short(i16),
    /// A 32-bit integer.
    Int(i32),
    /// A 64-bit integer.
    Long(i64),
    /// A 32-bit float.
    Float(f32),
    /// A 64-bit float.
    Double(f64),
    /// A string.
    String(String),
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Boolean(v) => write!(f, "{v}"),
            ConstValue::Char(v) => write!(f, "{v:?}"),
            ConstValue::Byte(v) => write!(f, "{v}b"),
            ConstValue::Short(v) => write!(f, "{v}s"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Long(v) => write!(f, "{v}L"),
            ConstValue::Float(v) => write!(f, "{v}f"),
            ConstValue::Double(v) => write!(f, "{v}"),
            ConstValue::String(v) => write!(f, "{v:?}"),
        }
    }
}
