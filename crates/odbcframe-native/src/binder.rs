use crate::buffer::{encode_guid, encode_wide, NativeColumnBuffer};
use crate::sys::{sql_type, CDataType, SqlLen, SQL_NTS, SQL_NULL_DATA};
use bytes::BufMut;
use metrics::counter;
use odbcframe_core::error::OdbcFrameError;
use odbcframe_core::table::Table;
use odbcframe_core::temporal::{self, Timestamp};
use odbcframe_core::types::{ColumnInfo, Row, SemanticType, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_MAX_VARIABLE_STRIDE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Upper bound on the per-row cell width of a streamed column.
    pub max_variable_stride: usize,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            max_variable_stride: DEFAULT_MAX_VARIABLE_STRIDE,
        }
    }
}

/// One cell after coercion, before it is laid into its column buffer.
pub(crate) enum Encoded {
    Null,
    Scalar { bytes: [u8; 16], len: usize },
    Text(Vec<u8>),
    Bytes(Vec<u8>),
}

impl Encoded {
    fn scalar(len: usize, write: impl FnOnce(&mut &mut [u8])) -> Self {
        let mut bytes = [0u8; 16];
        {
            let mut buf = &mut bytes[..];
            write(&mut buf);
        }
        Encoded::Scalar { bytes, len }
    }

    fn from_slice(slice: &[u8]) -> Self {
        Self::scalar(slice.len(), |buf| buf.put_slice(slice))
    }

    /// Bytes the cell occupies, terminator included.
    pub(crate) fn required(&self, terminator: usize) -> usize {
        match self {
            Encoded::Null => 0,
            Encoded::Scalar { len, .. } => *len,
            Encoded::Text(payload) => payload.len() + terminator,
            Encoded::Bytes(payload) => payload.len(),
        }
    }
}

/// Turns a table into column-major native buffers for a bulk bind.
#[derive(Debug, Default)]
pub struct ColumnarBinder {
    options: BindOptions,
    buffers_allocated: usize,
}

impl ColumnarBinder {
    pub fn new(options: BindOptions) -> Self {
        Self {
            options,
            buffers_allocated: 0,
        }
    }

    /// Column buffers allocated over the binder's lifetime.
    pub fn buffers_allocated(&self) -> usize {
        self.buffers_allocated
    }

    pub fn bind(
        &mut self,
        table: &Table,
        infos: &[ColumnInfo],
    ) -> Result<Vec<NativeColumnBuffer>, OdbcFrameError> {
        check_shape(table, infos)?;
        let rows = table.rows();
        let mut buffers = Vec::with_capacity(infos.len());
        for info in infos {
            buffers.push(self.bind_column(rows, info)?);
        }
        counter!("odbc_bind_rows").increment(rows.len() as u64);
        Ok(buffers)
    }

    fn bind_column(&mut self, rows: &[Row], info: &ColumnInfo) -> Result<NativeColumnBuffer, OdbcFrameError> {
        let c_type = CDataType::for_semantic(info.semantic_type).ok_or(OdbcFrameError::UnsupportedType {
            ordinal: info.ordinal,
            sql_type: sql_type::UNKNOWN,
        })?;
        let cells = rows
            .iter()
            .enumerate()
            .map(|(row, values)| encode_cell(&values.values[info.ordinal], info, row))
            .collect::<Result<Vec<_>, _>>()?;

        let terminator = c_type.terminator_len();
        let stride = self.stride_for(info, c_type, &cells)?;
        let mut buffer = NativeColumnBuffer::zeroed(info.ordinal, c_type, stride, rows.len());
        self.buffers_allocated += 1;

        for (row, cell) in cells.into_iter().enumerate() {
            let required = cell.required(terminator);
            if required > stride {
                return Err(OdbcFrameError::BufferTooLarge {
                    ordinal: info.ordinal,
                    row,
                    required,
                    stride,
                });
            }
            let indicator: SqlLen = match cell {
                Encoded::Null => SQL_NULL_DATA,
                Encoded::Scalar { bytes, len } => {
                    buffer.cell_mut(row)[..len].copy_from_slice(&bytes[..len]);
                    0
                }
                Encoded::Text(payload) => {
                    buffer.cell_mut(row)[..payload.len()].copy_from_slice(&payload);
                    if info.native_size > 0 {
                        SQL_NTS
                    } else {
                        payload.len() as SqlLen
                    }
                }
                Encoded::Bytes(payload) => {
                    buffer.cell_mut(row)[..payload.len()].copy_from_slice(&payload);
                    payload.len() as SqlLen
                }
            };
            buffer.set_indicator(row, indicator);
        }
        debug!(
            "bound column {} ({}) as {:?}: {} rows, stride {}",
            info.ordinal,
            info.name,
            c_type,
            rows.len(),
            stride
        );
        Ok(buffer)
    }

    fn stride_for(&self, info: &ColumnInfo, c_type: CDataType, cells: &[Encoded]) -> Result<usize, OdbcFrameError> {
        if let Some(width) = c_type.fixed_width() {
            return Ok(width);
        }
        if info.native_size > 0 {
            return Ok(info.text_capacity());
        }
        let terminator = c_type.terminator_len();
        let (widest_row, widest) = cells
            .iter()
            .enumerate()
            .map(|(row, cell)| (row, cell.required(terminator)))
            .max_by_key(|(_, required)| *required)
            .unwrap_or((0, 0));
        if widest > self.options.max_variable_stride {
            return Err(OdbcFrameError::BufferTooLarge {
                ordinal: info.ordinal,
                row: widest_row,
                required: widest,
                stride: self.options.max_variable_stride,
            });
        }
        Ok(widest.max(terminator).max(1))
    }
}

/// Binds with default options.
pub fn bind_table_for_bulk_write(
    table: &Table,
    infos: &[ColumnInfo],
) -> Result<Vec<NativeColumnBuffer>, OdbcFrameError> {
    ColumnarBinder::default().bind(table, infos)
}

fn check_shape(table: &Table, infos: &[ColumnInfo]) -> Result<(), OdbcFrameError> {
    if table.num_columns() != infos.len() {
        return Err(OdbcFrameError::RowColumnCountMismatch {
            row: None,
            expected: infos.len(),
            found: table.num_columns(),
        });
    }
    for (idx, info) in infos.iter().enumerate() {
        if info.ordinal != idx {
            return Err(OdbcFrameError::ColumnOrderMismatch {
                position: idx,
                ordinal: info.ordinal,
            });
        }
    }
    if let Some((row, values)) = table
        .rows()
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != infos.len())
    {
        return Err(OdbcFrameError::RowColumnCountMismatch {
            row: Some(row),
            expected: infos.len(),
            found: values.len(),
        });
    }
    Ok(())
}

pub(crate) fn encode_cell(value: &Value, info: &ColumnInfo, row: usize) -> Result<Encoded, OdbcFrameError> {
    let mismatch = || OdbcFrameError::ValueTypeMismatch {
        ordinal: info.ordinal,
        row,
        target: info.semantic_type,
        preview: value.preview(),
    };
    let encoded = match (info.semantic_type, value) {
        (_, Value::Null) => Encoded::Null,
        (SemanticType::Unknown, _) => {
            return Err(OdbcFrameError::UnsupportedType {
                ordinal: info.ordinal,
                sql_type: sql_type::UNKNOWN,
            })
        }
        (SemanticType::Bool, Value::Bool(v)) => Encoded::scalar(1, |buf| buf.put_u8(u8::from(*v))),
        (SemanticType::Int32, Value::Int32(v)) => Encoded::scalar(4, |buf| buf.put_i32_ne(*v)),
        (SemanticType::Int32, Value::Int64(v)) => {
            let narrowed = i32::try_from(*v).map_err(|_| mismatch())?;
            Encoded::scalar(4, |buf| buf.put_i32_ne(narrowed))
        }
        (SemanticType::Int64, Value::Int32(v)) => Encoded::scalar(8, |buf| buf.put_i64_ne(i64::from(*v))),
        (SemanticType::Int64, Value::Int64(v)) => Encoded::scalar(8, |buf| buf.put_i64_ne(*v)),
        (SemanticType::Float64, Value::Float64(v)) => Encoded::scalar(8, |buf| buf.put_f64_ne(*v)),
        (SemanticType::Float64, Value::Int32(v)) => Encoded::scalar(8, |buf| buf.put_f64_ne(f64::from(*v))),
        (SemanticType::FixedString | SemanticType::VariableString, Value::Float64(v)) => {
            Encoded::Text(v.to_string().into_bytes())
        }
        (
            SemanticType::FixedString | SemanticType::VariableString,
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s),
        ) => Encoded::Text(s.as_bytes().to_vec()),
        (SemanticType::WideString, Value::Float64(v)) => Encoded::Text(encode_wide(&v.to_string())),
        (
            SemanticType::WideString,
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s),
        ) => Encoded::Text(encode_wide(s)),
        (SemanticType::Binary, Value::Binary(b)) => Encoded::Bytes(b.clone()),
        (
            target @ (SemanticType::Timestamp | SemanticType::Date | SemanticType::Time),
            Value::Timestamp(ts) | Value::Date(ts) | Value::Time(ts),
        ) => encode_temporal(target, *ts),
        (
            target @ (SemanticType::Timestamp | SemanticType::Date | SemanticType::Time),
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s),
        ) => encode_temporal(target, temporal::parse(s)?),
        (SemanticType::Guid, Value::Guid(id)) => Encoded::from_slice(&encode_guid(id)),
        (
            SemanticType::Guid,
            Value::FixedString(s) | Value::VariableString(s) | Value::WideString(s),
        ) => {
            let id = Uuid::parse_str(s.trim()).map_err(|_| mismatch())?;
            Encoded::from_slice(&encode_guid(&id))
        }
        _ => return Err(mismatch()),
    };
    Ok(encoded)
}

/// Every temporal value travels as a timestamp struct; the target decides
/// which half of it is kept.
fn encode_temporal(target: SemanticType, ts: Timestamp) -> Encoded {
    let projected = match target {
        SemanticType::Date => ts.date_part(),
        SemanticType::Time => ts.time_part(),
        _ => ts,
    };
    Encoded::from_slice(&temporal::encode(projected))
}
