use crate::buffer::{decode_guid, decode_wide, terminated_len, GUID_LEN};
use crate::diagnostics::check;
use crate::sys::{CDataType, FieldFetch, FieldSource, NativeStatement, SqlReturn, SQL_NO_TOTAL, SQL_NULL_DATA};
use bytes::Buf;
use metrics::counter;
use odbcframe_core::error::OdbcFrameError;
use odbcframe_core::table::Table;
use odbcframe_core::temporal::{self, TIMESTAMP_STRUCT_LEN};
use odbcframe_core::types::{ColumnInfo, Row, SemanticType, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Buffer size for each `SQLGetData` call on a streamed column.
    pub chunk_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub fn decode_row<S: FieldSource + ?Sized>(
    infos: &[ColumnInfo],
    source: &mut S,
    options: &DecodeOptions,
) -> Result<Row, OdbcFrameError> {
    let values = infos
        .iter()
        .map(|info| decode_field(info, &mut *source, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(values))
}

pub fn decode_field<S: FieldSource + ?Sized>(
    info: &ColumnInfo,
    source: &mut S,
    options: &DecodeOptions,
) -> Result<Value, OdbcFrameError> {
    let mut field = Field::new(info, source)?;
    let value = match info.semantic_type {
        SemanticType::Bool => field.scalar(1)?.map(|cell| Value::Bool(cell[0] != 0)),
        SemanticType::Int32 => field.scalar(4)?.map(|cell| {
            let mut buf = &cell[..];
            Value::Int32(buf.get_i32_ne())
        }),
        SemanticType::Int64 => field.scalar(8)?.map(|cell| {
            let mut buf = &cell[..];
            Value::Int64(buf.get_i64_ne())
        }),
        SemanticType::Float64 => field.scalar(8)?.map(|cell| {
            let mut buf = &cell[..];
            Value::Float64(buf.get_f64_ne())
        }),
        SemanticType::FixedString | SemanticType::VariableString => {
            let first = first_chunk(info, options);
            match field.chunked(first, options.chunk_size)? {
                None => None,
                Some(bytes) => {
                    let text = String::from_utf8(bytes).map_err(|e| field.error(e.to_string()))?;
                    Some(if info.semantic_type == SemanticType::FixedString {
                        Value::FixedString(text)
                    } else {
                        Value::VariableString(text)
                    })
                }
            }
        }
        SemanticType::WideString => {
            let first = first_chunk(info, options);
            match field.chunked(first, options.chunk_size)? {
                None => None,
                Some(bytes) => {
                    let text = decode_wide(&bytes).map_err(|e| field.error(e.to_string()))?;
                    Some(Value::WideString(text))
                }
            }
        }
        SemanticType::Binary if info.native_size > 0 => field
            .chunked(info.native_size, options.chunk_size)?
            .map(Value::Binary),
        SemanticType::Binary => field.sized(options.chunk_size)?.map(Value::Binary),
        SemanticType::Timestamp | SemanticType::Date | SemanticType::Time => {
            match field.scalar(TIMESTAMP_STRUCT_LEN)? {
                None => None,
                Some(cell) => {
                    let ts = temporal::decode(&cell).ok_or_else(|| field.error("short temporal struct".to_string()))?;
                    Some(project_temporal(info.semantic_type, ts))
                }
            }
        }
        SemanticType::Guid => match field.scalar(GUID_LEN)? {
            None => None,
            Some(cell) => {
                let id = decode_guid(&cell[..GUID_LEN]).ok_or_else(|| field.error("short guid struct".to_string()))?;
                Some(Value::Guid(id))
            }
        },
        SemanticType::Unknown => return Err(field.error("column type is unknown".to_string())),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Fetches every remaining row of the open result set.
pub fn decode_result_rows<S: NativeStatement + ?Sized>(
    stmt: &mut S,
    infos: &[ColumnInfo],
    options: &DecodeOptions,
) -> Result<Table, OdbcFrameError> {
    let mut table = Table::new(infos.to_vec());
    loop {
        let ret = stmt.fetch();
        if ret == SqlReturn::NoData {
            break;
        }
        check(ret, "SQLFetch", &*stmt)?;
        let row = decode_row(infos, &mut *stmt, options)?;
        table.push_row(row)?;
    }
    counter!("odbc_decode_rows").increment(table.num_rows() as u64);
    debug!("decoded {} rows across {} columns", table.num_rows(), infos.len());
    Ok(table)
}

/// Keeps the fields of `ts` that the column's type carries.
pub fn project_temporal(ty: SemanticType, ts: temporal::Timestamp) -> Value {
    match ty {
        SemanticType::Date => Value::Date(ts.date_part()),
        SemanticType::Time => Value::Time(ts.time_part()),
        _ => Value::Timestamp(ts),
    }
}

fn first_chunk(info: &ColumnInfo, options: &DecodeOptions) -> usize {
    if info.native_size > 0 {
        info.text_capacity()
    } else {
        options.chunk_size
    }
}

/// One column of the current row and the source it is read from.
struct Field<'a, S: ?Sized> {
    source: &'a mut S,
    ordinal: usize,
    column: u16,
    c_type: CDataType,
}

impl<'a, S: FieldSource + ?Sized> Field<'a, S> {
    fn new(info: &ColumnInfo, source: &'a mut S) -> Result<Self, OdbcFrameError> {
        let error = |reason: &str| OdbcFrameError::FieldDecodeError {
            ordinal: info.ordinal,
            reason: reason.to_string(),
        };
        let c_type = CDataType::for_semantic(info.semantic_type).ok_or_else(|| error("column type is unknown"))?;
        let column = u16::try_from(info.ordinal + 1).map_err(|_| error("column number out of range"))?;
        Ok(Self {
            source,
            ordinal: info.ordinal,
            column,
            c_type,
        })
    }

    fn error(&self, reason: String) -> OdbcFrameError {
        OdbcFrameError::FieldDecodeError {
            ordinal: self.ordinal,
            reason,
        }
    }

    fn get(&mut self, buf: &mut [u8]) -> Result<FieldFetch, OdbcFrameError> {
        let fetch = self.source.get_data(self.column, self.c_type, buf);
        if fetch.ret == SqlReturn::NoData {
            return Ok(fetch);
        }
        check(fetch.ret, "SQLGetData", &*self.source)?;
        Ok(fetch)
    }

    /// Single fetch of a fixed-width cell; `None` for null.
    fn scalar(&mut self, width: usize) -> Result<Option<[u8; TIMESTAMP_STRUCT_LEN]>, OdbcFrameError> {
        let mut cell = [0u8; TIMESTAMP_STRUCT_LEN];
        let fetch = self.get(&mut cell[..width])?;
        if fetch.ret == SqlReturn::NoData {
            return Err(self.error("no data for fixed-width column".to_string()));
        }
        if fetch.indicator == SQL_NULL_DATA {
            return Ok(None);
        }
        Ok(Some(cell))
    }

    /// Drains character or binary data: the first call uses `first` bytes,
    /// later calls `chunk` bytes, until the driver reports the end.
    fn chunked(&mut self, first: usize, chunk: usize) -> Result<Option<Vec<u8>>, OdbcFrameError> {
        let terminator = self.c_type.terminator_len();
        let mut acc = Vec::new();
        let mut buf = vec![0u8; first.max(terminator + 1)];
        let mut calls = 0usize;
        loop {
            let capacity = payload_capacity(buf.len(), terminator);
            let fetch = self.get(&mut buf)?;
            calls += 1;
            if fetch.ret == SqlReturn::NoData {
                break;
            }
            if fetch.indicator == SQL_NULL_DATA {
                return Ok(None);
            }
            let pending = match fetch.indicator {
                SQL_NO_TOTAL => None,
                n if n >= 0 => Some(n as usize),
                n => return Err(self.error(format!("invalid length indicator {n}"))),
            };
            let take = match pending {
                Some(p) => p.min(capacity),
                // Last part of unknown length: the terminator marks its end.
                None if fetch.ret == SqlReturn::Success && terminator > 0 => {
                    terminated_len(&buf, terminator).min(capacity)
                }
                None => capacity,
            };
            acc.extend_from_slice(&buf[..take]);
            if fetch.ret == SqlReturn::Success || pending.is_some_and(|p| p <= capacity) {
                break;
            }
            if buf.len() != chunk {
                buf = vec![0u8; chunk.max(terminator + 1)];
            }
        }
        if calls > 1 {
            debug!("column {} streamed {} bytes in {} calls", self.ordinal, acc.len(), calls);
        }
        Ok(Some(acc))
    }

    /// Binary column of unknown size: ask for the total length, then read it
    /// in one call.
    fn sized(&mut self, chunk: usize) -> Result<Option<Vec<u8>>, OdbcFrameError> {
        let sizing = self.get(&mut [])?;
        if sizing.ret == SqlReturn::NoData {
            return Ok(Some(Vec::new()));
        }
        let total = match sizing.indicator {
            SQL_NULL_DATA => return Ok(None),
            SQL_NO_TOTAL => return self.chunked(chunk, chunk),
            n if n >= 0 => n as usize,
            n => return Err(self.error(format!("invalid length indicator {n}"))),
        };
        if total == 0 {
            return Ok(Some(Vec::new()));
        }
        let mut payload = vec![0u8; total];
        let fetch = self.get(&mut payload)?;
        if fetch.ret == SqlReturn::NoData {
            return Err(self.error("binary payload vanished after its length was reported".to_string()));
        }
        if fetch.indicator >= 0 {
            payload.truncate((fetch.indicator as usize).min(total));
        }
        Ok(Some(payload))
    }
}

fn payload_capacity(len: usize, terminator: usize) -> usize {
    let capacity = len.saturating_sub(terminator);
    if terminator > 1 {
        capacity - capacity % terminator
    } else {
        capacity
    }
}
