pub mod catalog;
pub mod error;
pub mod table;
pub mod temporal;
pub mod types;

pub use catalog::{align, resolve, resolve_param, ColumnDescription, ParamDescription};
pub use error::{DiagnosticRecord, DiagnosticSet, OdbcFrameError};
pub use table::Table;
pub use temporal::Timestamp;
pub use types::{ColumnInfo, Nullability, Row, SemanticType, Value};
