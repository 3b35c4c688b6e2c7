//! Single-row writes through the input parameters of a prepared statement.

use crate::binder::{encode_cell, Encoded};
use crate::buffer::ParameterView;
use crate::describe::failure;
use crate::diagnostics::check;
use crate::sys::{CDataType, NativeStatement, SqlLen, SqlReturn, SQL_NULL_DATA};
use metrics::counter;
use odbcframe_core::catalog::{resolve_param, ParamDescription};
use odbcframe_core::error::OdbcFrameError;
use odbcframe_core::types::{ColumnInfo, Value};
use tracing::debug;

/// Owned storage for one bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBuffer {
    number: u16,
    c_type: CDataType,
    desc: ParamDescription,
    data: Vec<u8>,
    indicator: SqlLen,
}

impl ParameterBuffer {
    pub fn c_type(&self) -> CDataType {
        self.c_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn indicator(&self) -> SqlLen {
        self.indicator
    }

    pub fn view(&self) -> ParameterView<'_> {
        ParameterView {
            number: self.number,
            c_type: self.c_type,
            sql_type: self.desc.sql_type,
            column_size: self.desc.parameter_size,
            decimal_digits: self.desc.decimal_digits,
            data: &self.data,
            indicator: self.indicator,
        }
    }
}

/// Encodes `value` for the parameter laid out as `info`, coercing it the
/// same way the bulk binder does.
///
/// Character data carries its length in the indicator and keeps room for a
/// terminator after the payload.
pub fn encode_parameter(
    value: &Value,
    info: &ColumnInfo,
    desc: &ParamDescription,
) -> Result<ParameterBuffer, OdbcFrameError> {
    let c_type = CDataType::for_semantic(info.semantic_type).ok_or(OdbcFrameError::UnsupportedType {
        ordinal: info.ordinal,
        sql_type: desc.sql_type,
    })?;
    let number = u16::try_from(info.ordinal + 1).map_err(|_| OdbcFrameError::FieldDecodeError {
        ordinal: info.ordinal,
        reason: "parameter number out of range".to_string(),
    })?;
    let encoded = encode_cell(value, info, 0)?;
    let terminator = c_type.terminator_len();
    let required = encoded.required(terminator);
    if c_type.fixed_width().is_none() && info.native_size > 0 && required > info.text_capacity() {
        return Err(OdbcFrameError::BufferTooLarge {
            ordinal: info.ordinal,
            row: 0,
            required,
            stride: info.text_capacity(),
        });
    }
    let (data, indicator) = match encoded {
        Encoded::Null => (Vec::new(), SQL_NULL_DATA),
        Encoded::Scalar { bytes, len } => (bytes[..len].to_vec(), 0),
        Encoded::Text(mut payload) => {
            let len = payload.len() as SqlLen;
            payload.resize(payload.len() + terminator, 0);
            (payload, len)
        }
        Encoded::Bytes(payload) => {
            let len = payload.len() as SqlLen;
            (payload, len)
        }
    };
    Ok(ParameterBuffer {
        number,
        c_type,
        desc: *desc,
        data,
        indicator,
    })
}

/// Prepares `sql`, binds one value per parameter marker and executes it.
///
/// Every parameter is described first, so nulls get the SQL type the
/// driver expects and values are coerced to it. Returns the affected row
/// count, zero when the driver does not report one.
pub fn execute_with_params<S: NativeStatement + ?Sized>(
    stmt: &mut S,
    sql: &str,
    params: &[Value],
) -> Result<usize, OdbcFrameError> {
    check(stmt.prepare(sql), "SQLPrepare", &*stmt)?;
    let expected = stmt.num_params().map_err(|ret| failure(ret, "SQLNumParams", &*stmt))?;
    if usize::from(expected) != params.len() {
        return Err(OdbcFrameError::RowColumnCountMismatch {
            row: None,
            expected: usize::from(expected),
            found: params.len(),
        });
    }

    let mut buffers = Vec::with_capacity(params.len());
    for (idx, value) in params.iter().enumerate() {
        let number = idx as u16 + 1;
        let desc = stmt
            .describe_param(number)
            .map_err(|ret| failure(ret, "SQLDescribeParam", &*stmt))?;
        let info = resolve_param(idx, &desc)?;
        buffers.push(encode_parameter(value, &info, &desc)?);
    }
    for buffer in &buffers {
        check(stmt.bind_parameter(&buffer.view()), "SQLBindParameter", &*stmt)?;
    }

    match stmt.execute() {
        SqlReturn::NoData => {}
        ret => check(ret, "SQLExecute", &*stmt)?,
    }
    let affected = stmt.row_count().map_err(|ret| failure(ret, "SQLRowCount", &*stmt))?;
    counter!("odbc_param_executions").increment(1);
    debug!("executed with {} parameters, {} rows affected", params.len(), affected);
    Ok(usize::try_from(affected).unwrap_or(0))
}

/// `INSERT` statement with one marker per column of `table`.
pub fn insert_statement(table: &str, columns: usize) -> String {
    let markers = vec!["?"; columns].join(", ");
    format!("INSERT INTO {table} VALUES ({markers})")
}
