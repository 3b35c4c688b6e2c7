use crate::catalog::sql_type;
use crate::temporal::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const PREVIEW_CHARS: usize = 32;

/// Sign, decimal point and terminator around the digits of numeric text.
pub const NUMERIC_TEXT_OVERHEAD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Bool,
    Int32,
    Int64,
    Float64,
    FixedString,
    VariableString,
    WideString,
    Binary,
    Timestamp,
    Date,
    Time,
    Guid,
    /// Column whose type has not been inferred or resolved yet.
    Unknown,
}

impl SemanticType {
    pub fn is_string(self) -> bool {
        matches!(
            self,
            SemanticType::FixedString | SemanticType::VariableString | SemanticType::WideString
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            SemanticType::Timestamp | SemanticType::Date | SemanticType::Time
        )
    }

    /// Types whose cells may be streamed when the driver reports no size.
    pub fn is_variable_length(self) -> bool {
        self.is_string() || self == SemanticType::Binary
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Bool => "bool",
            SemanticType::Int32 => "int32",
            SemanticType::Int64 => "int64",
            SemanticType::Float64 => "float64",
            SemanticType::FixedString => "fixed string",
            SemanticType::VariableString => "variable string",
            SemanticType::WideString => "wide string",
            SemanticType::Binary => "binary",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::Guid => "guid",
            SemanticType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Nullability {
    NoNulls,
    Nullable,
    #[default]
    Unknown,
}

impl Nullability {
    pub fn from_raw(code: i16) -> Self {
        match code {
            0 => Nullability::NoNulls,
            1 => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Bytes per native cell; 0 means the column is streamed in chunks.
    pub native_size: usize,
    pub ordinal: usize,
    #[serde(default)]
    pub nullable: Nullability,
    /// SQL type code the layout was resolved from; `UNKNOWN` for columns
    /// typed from their values.
    #[serde(default)]
    pub sql_type: i16,
}

impl ColumnInfo {
    /// A named column whose type is inferred from the first row added.
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name, SemanticType::Unknown, 0)
    }

    pub fn typed(name: impl Into<String>, semantic_type: SemanticType, native_size: usize) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            native_size,
            ordinal: 0,
            nullable: Nullability::Unknown,
            sql_type: sql_type::UNKNOWN,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.native_size == 0 && self.semantic_type.is_variable_length()
    }

    /// Bytes a character cell of this column needs. Numeric and decimal
    /// columns are sized by precision, which leaves out sign, point and
    /// terminator.
    pub fn text_capacity(&self) -> usize {
        match self.sql_type {
            sql_type::NUMERIC | sql_type::DECIMAL => self.native_size + NUMERIC_TEXT_OVERHEAD,
            _ => self.native_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    FixedString(String),
    VariableString(String),
    WideString(String),
    Binary(Vec<u8>),
    Timestamp(Timestamp),
    Date(Timestamp),
    Time(Timestamp),
    Guid(Uuid),
}

impl Value {
    /// The semantic type this value fixes a column to; `None` for null.
    pub fn natural_type(&self) -> Option<SemanticType> {
        let ty = match self {
            Value::Null => return None,
            Value::Bool(_) => SemanticType::Bool,
            Value::Int32(_) => SemanticType::Int32,
            Value::Int64(_) => SemanticType::Int64,
            Value::Float64(_) => SemanticType::Float64,
            Value::FixedString(_) => SemanticType::FixedString,
            Value::VariableString(_) => SemanticType::VariableString,
            Value::WideString(_) => SemanticType::WideString,
            Value::Binary(_) => SemanticType::Binary,
            Value::Timestamp(_) => SemanticType::Timestamp,
            Value::Date(_) => SemanticType::Date,
            Value::Time(_) => SemanticType::Time,
            Value::Guid(_) => SemanticType::Guid,
        };
        Some(ty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) | Value::Date(ts) | Value::Time(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Short rendering used in error messages.
    pub fn preview(&self) -> String {
        let full = match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s) => format!("{s:?}"),
            Value::Binary(b) => format!("<{} bytes>", b.len()),
            Value::Timestamp(ts) | Value::Date(ts) | Value::Time(ts) => ts.to_string(),
            Value::Guid(u) => u.to_string(),
        };
        if full.chars().count() > PREVIEW_CHARS {
            let mut cut: String = full.chars().take(PREVIEW_CHARS).collect();
            cut.push_str("...");
            cut
        } else {
            full
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::VariableString(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::VariableString(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_i64(&self, index: usize) -> Option<i64> {
        match self.get(index)? {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self.get(index)? {
            Value::Float64(v) => Some(*v),
            Value::Int32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index)?.as_str()
    }
}
