use crate::types::SemanticType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// SQLSTATE reported by drivers when the link to the server is gone.
pub const CONNECTION_LOST_STATE: &str = "08S01";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub state_code: String,
    pub native_error_code: i32,
    pub message: String,
}

impl DiagnosticRecord {
    pub fn new(state_code: impl Into<String>, native_error_code: i32, message: impl Into<String>) -> Self {
        Self {
            state_code: state_code.into(),
            native_error_code,
            message: message.into(),
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        self.state_code == CONNECTION_LOST_STATE
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} {}", self.state_code, self.message)
    }
}

/// Records attached to one failed native call, in driver order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiagnosticSet {
    api_name: String,
    records: Vec<DiagnosticRecord>,
}

impl DiagnosticSet {
    pub fn new(api_name: impl Into<String>, records: Vec<DiagnosticRecord>) -> Self {
        Self {
            api_name: api_name.into(),
            records,
        }
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl fmt::Display for DiagnosticSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.api_name)?;
        for (idx, record) in self.records.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OdbcFrameError {
    #[error("unsupported sql type {sql_type} for column {ordinal}")]
    UnsupportedType { ordinal: usize, sql_type: i16 },
    #[error("column count mismatch{}: expected {expected}, found {found}", row_suffix(.row))]
    RowColumnCountMismatch {
        row: Option<usize>,
        expected: usize,
        found: usize,
    },
    #[error("layout entry {position} describes column {ordinal}")]
    ColumnOrderMismatch { position: usize, ordinal: usize },
    #[error("column {ordinal} holds {expected}, value has type {found}")]
    TypeMismatch {
        ordinal: usize,
        expected: SemanticType,
        found: SemanticType,
    },
    #[error("row {row} column {ordinal}: cannot store {preview} as {target}")]
    ValueTypeMismatch {
        ordinal: usize,
        row: usize,
        target: SemanticType,
        preview: String,
    },
    #[error("cannot parse temporal value {input:?}")]
    TemporalParseError { input: String },
    #[error("row {row} column {ordinal}: value needs {required} bytes but the cell holds {stride}")]
    BufferTooLarge {
        ordinal: usize,
        row: usize,
        required: usize,
        stride: usize,
    },
    #[error("column {ordinal}: {reason}")]
    FieldDecodeError { ordinal: usize, reason: String },
    #[error("{api_name}: connection lost: {record}")]
    ConnectionLost {
        api_name: String,
        record: DiagnosticRecord,
    },
    #[error("{diagnostics}")]
    NativeCallFailed {
        api_name: String,
        diagnostics: DiagnosticSet,
    },
    #[error("table {table} already contains rows")]
    TableNotEmpty { table: String },
}

impl OdbcFrameError {
    /// The handle that raised this error must not be used again.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, OdbcFrameError::ConnectionLost { .. })
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticSet> {
        match self {
            OdbcFrameError::NativeCallFailed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}
