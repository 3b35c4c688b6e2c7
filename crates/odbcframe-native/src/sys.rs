//! The slice of the call-level interface this crate is written against.
//!
//! Drivers (or test doubles) implement [`NativeStatement`]; everything else in
//! the crate only ever talks to a statement through these traits.

use crate::buffer::{ColumnView, ParameterView};
use odbcframe_core::catalog::{ColumnDescription, ParamDescription};
use odbcframe_core::error::DiagnosticRecord;
use odbcframe_core::types::SemanticType;

pub use odbcframe_core::catalog::sql_type;

/// `SQLLEN`: signed length or indicator.
pub type SqlLen = isize;

pub const SQL_NULL_DATA: SqlLen = -1;
pub const SQL_NTS: SqlLen = -3;
pub const SQL_NO_TOTAL: SqlLen = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlReturn {
    Success,
    SuccessWithInfo,
    Error,
    NoData,
    NeedData,
}

impl SqlReturn {
    pub fn from_raw(code: i16) -> Self {
        match code {
            0 => SqlReturn::Success,
            1 => SqlReturn::SuccessWithInfo,
            99 => SqlReturn::NeedData,
            100 => SqlReturn::NoData,
            _ => SqlReturn::Error,
        }
    }

    pub fn raw(self) -> i16 {
        match self {
            SqlReturn::Success => 0,
            SqlReturn::SuccessWithInfo => 1,
            SqlReturn::Error => -1,
            SqlReturn::NeedData => 99,
            SqlReturn::NoData => 100,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, SqlReturn::Success | SqlReturn::SuccessWithInfo)
    }
}

/// C buffer types used for binding and `SQLGetData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CDataType {
    Bit,
    Long,
    SBigInt,
    Double,
    Char,
    WChar,
    Binary,
    /// Carries timestamp, date and time values alike.
    TypeTimestamp,
    Guid,
}

impl CDataType {
    pub fn raw(self) -> i16 {
        match self {
            CDataType::Bit => -7,
            CDataType::Long => 4,
            CDataType::SBigInt => -25,
            CDataType::Double => 8,
            CDataType::Char => 1,
            CDataType::WChar => -8,
            CDataType::Binary => -2,
            CDataType::TypeTimestamp => 93,
            CDataType::Guid => -11,
        }
    }

    pub fn for_semantic(ty: SemanticType) -> Option<Self> {
        let c_type = match ty {
            SemanticType::Bool => CDataType::Bit,
            SemanticType::Int32 => CDataType::Long,
            SemanticType::Int64 => CDataType::SBigInt,
            SemanticType::Float64 => CDataType::Double,
            SemanticType::FixedString | SemanticType::VariableString => CDataType::Char,
            SemanticType::WideString => CDataType::WChar,
            SemanticType::Binary => CDataType::Binary,
            SemanticType::Timestamp | SemanticType::Date | SemanticType::Time => CDataType::TypeTimestamp,
            SemanticType::Guid => CDataType::Guid,
            SemanticType::Unknown => return None,
        };
        Some(c_type)
    }

    /// Bytes of the trailing NUL the driver writes after character data.
    pub fn terminator_len(self) -> usize {
        match self {
            CDataType::Char => 1,
            CDataType::WChar => 2,
            _ => 0,
        }
    }

    /// Cell width for fixed-size types, `None` for character and binary data.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            CDataType::Bit => Some(1),
            CDataType::Long => Some(4),
            CDataType::SBigInt | CDataType::Double => Some(8),
            CDataType::TypeTimestamp | CDataType::Guid => Some(16),
            CDataType::Char | CDataType::WChar | CDataType::Binary => None,
        }
    }
}

/// Outcome of one `SQLGetData` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFetch {
    pub ret: SqlReturn,
    /// Bytes still available before this call, `SQL_NULL_DATA` or `SQL_NO_TOTAL`.
    pub indicator: SqlLen,
}

/// Outcome of one `SQLGetDiagRec` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagFetch {
    Record(DiagnosticRecord),
    NoData,
    Failed(SqlReturn),
}

pub trait DiagnosticSource {
    /// `record_number` starts at 1.
    fn get_diag_rec(&self, record_number: i16) -> DiagFetch;
}

pub trait FieldSource: DiagnosticSource {
    /// Reads (the next part of) a column of the current row into `buf`.
    /// `column` is 1-based.
    fn get_data(&mut self, column: u16, target: CDataType, buf: &mut [u8]) -> FieldFetch;
}

pub trait NativeStatement: FieldSource {
    fn exec_direct(&mut self, sql: &str) -> SqlReturn;

    fn num_result_cols(&mut self) -> Result<u16, SqlReturn>;

    /// `column` is 1-based.
    fn describe_col(&mut self, column: u16) -> Result<ColumnDescription, SqlReturn>;

    fn fetch(&mut self) -> SqlReturn;

    fn row_count(&mut self) -> Result<SqlLen, SqlReturn>;

    /// Binds the columns and adds their rows to the open result set.
    ///
    /// The driver only borrows the buffers for the duration of this call.
    fn bulk_add(&mut self, columns: &[ColumnView<'_>]) -> SqlReturn;

    fn prepare(&mut self, sql: &str) -> SqlReturn;

    fn num_params(&mut self) -> Result<u16, SqlReturn>;

    /// `param` is 1-based.
    fn describe_param(&mut self, param: u16) -> Result<ParamDescription, SqlReturn>;

    /// Binds one input parameter of the prepared statement. The view is
    /// only borrowed for this call, so the driver keeps its own copy.
    fn bind_parameter(&mut self, param: &ParameterView<'_>) -> SqlReturn;

    /// Runs the prepared statement with the bound parameters.
    fn execute(&mut self) -> SqlReturn;
}
