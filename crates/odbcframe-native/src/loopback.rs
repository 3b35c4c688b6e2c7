//! In-memory driver that stores bulk-added rows per table and serves them
//! back through `SQLFetch` / `SQLGetData` the way a real driver does,
//! including truncation, chunked reads and diagnostic records. Prepared
//! `INSERT INTO t VALUES (?, ...)` statements take one row per execute.

use crate::buffer::{terminated_len, ColumnView, ParameterView};
use crate::sys::{
    CDataType, DiagFetch, DiagnosticSource, FieldFetch, FieldSource, NativeStatement, SqlLen, SqlReturn,
    SQL_NTS, SQL_NULL_DATA,
};
use odbcframe_core::catalog::{self, ColumnDescription, ParamDescription};
use odbcframe_core::error::{DiagnosticRecord, OdbcFrameError};
use std::collections::HashMap;

type Cell = Option<Vec<u8>>;
type Fault = (&'static str, String);

#[derive(Debug, Clone)]
struct StoredTable {
    columns: Vec<ColumnDescription>,
    c_types: Vec<CDataType>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
pub struct LoopbackDatabase {
    tables: HashMap<String, StoredTable>,
    injected: HashMap<String, Vec<DiagnosticRecord>>,
    calls: HashMap<String, usize>,
}

impl LoopbackDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDescription>) -> Result<(), OdbcFrameError> {
        let c_types = catalog::resolve(&columns)?
            .iter()
            .map(|info| {
                CDataType::for_semantic(info.semantic_type).ok_or_else(|| OdbcFrameError::UnsupportedType {
                    ordinal: info.ordinal,
                    sql_type: columns[info.ordinal].sql_type,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.tables.insert(
            name.to_string(),
            StoredTable {
                columns,
                c_types,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }

    /// The next call to `api_name` fails with `records` as its diagnostics.
    pub fn fail_next(&mut self, api_name: &str, records: Vec<DiagnosticRecord>) {
        self.injected.insert(api_name.to_string(), records);
    }

    /// Number of times `api_name` has been called on any statement.
    pub fn call_count(&self, api_name: &str) -> usize {
        self.calls.get(api_name).copied().unwrap_or(0)
    }

    pub fn statement(&mut self) -> LoopbackStatement<'_> {
        LoopbackStatement {
            db: self,
            cursor: None,
            prepared: None,
            diagnostics: Vec::new(),
            last_row_count: -1,
        }
    }
}

#[derive(Debug)]
struct Cursor {
    table: String,
    position: Option<usize>,
    /// Bytes already handed out per column of the current row.
    consumed: Vec<Option<usize>>,
}

/// A prepared insert and the parameters bound to it so far.
#[derive(Debug)]
struct Prepared {
    table: String,
    params: Vec<Option<Cell>>,
}

#[derive(Debug)]
pub struct LoopbackStatement<'db> {
    db: &'db mut LoopbackDatabase,
    cursor: Option<Cursor>,
    prepared: Option<Prepared>,
    diagnostics: Vec<DiagnosticRecord>,
    last_row_count: SqlLen,
}

impl LoopbackStatement<'_> {
    /// Starts a call: clears diagnostics and applies any injected failure.
    fn enter(&mut self, api_name: &str) -> Option<SqlReturn> {
        self.diagnostics.clear();
        *self.db.calls.entry(api_name.to_string()).or_default() += 1;
        let records = self.db.injected.remove(api_name)?;
        self.diagnostics = records;
        Some(SqlReturn::Error)
    }

    fn fail(&mut self, (state, message): Fault) -> SqlReturn {
        self.diagnostics.push(DiagnosticRecord::new(state, 0, message));
        SqlReturn::Error
    }

    fn open_table(&self) -> Result<&StoredTable, Fault> {
        let cursor = self.cursor.as_ref().ok_or_else(|| ("24000", "invalid cursor state".to_string()))?;
        self.db
            .tables
            .get(&cursor.table)
            .ok_or_else(|| ("42S02", format!("table {} not found", cursor.table)))
    }

    fn exec(&mut self, sql: &str) -> Result<(), Fault> {
        self.prepared = None;
        let words: Vec<&str> = sql.split_whitespace().collect();
        match words.as_slice() {
            [select, "*", from, name] if select.eq_ignore_ascii_case("select") && from.eq_ignore_ascii_case("from") => {
                let table = self
                    .db
                    .tables
                    .get(*name)
                    .ok_or_else(|| ("42S02", format!("table {name} not found")))?;
                self.last_row_count = table.rows.len() as SqlLen;
                self.cursor = Some(Cursor {
                    table: name.to_string(),
                    position: None,
                    consumed: vec![None; table.columns.len()],
                });
                Ok(())
            }
            [delete, from, name] if delete.eq_ignore_ascii_case("delete") && from.eq_ignore_ascii_case("from") => {
                let table = self
                    .db
                    .tables
                    .get_mut(*name)
                    .ok_or_else(|| ("42S02", format!("table {name} not found")))?;
                self.last_row_count = table.rows.len() as SqlLen;
                table.rows.clear();
                self.cursor = None;
                Ok(())
            }
            _ => Err(("42000", format!("unsupported statement: {sql}"))),
        }
    }

    fn append(&mut self, columns: &[ColumnView<'_>]) -> Result<usize, Fault> {
        let cursor = self.cursor.as_ref().ok_or_else(|| ("24000", "invalid cursor state".to_string()))?;
        let table = self
            .db
            .tables
            .get_mut(&cursor.table)
            .ok_or_else(|| ("42S02", format!("table {} not found", cursor.table)))?;
        if columns.len() != table.columns.len() {
            return Err(("07002", format!("{} columns bound, table has {}", columns.len(), table.columns.len())));
        }
        let rows = columns.first().map_or(0, ColumnView::rows);
        let mut ordered: Vec<Option<&ColumnView<'_>>> = vec![None; table.columns.len()];
        for view in columns {
            if view.rows() != rows {
                return Err(("HY090", "bound columns disagree on row count".to_string()));
            }
            let idx = usize::from(view.column_number)
                .checked_sub(1)
                .filter(|idx| *idx < table.columns.len())
                .ok_or_else(|| ("07009", format!("invalid column number {}", view.column_number)))?;
            if view.c_type != table.c_types[idx] {
                return Err(("07006", format!("column {} cannot be bound as {:?}", view.column_number, view.c_type)));
            }
            ordered[idx] = Some(view);
        }
        let ordered: Vec<&ColumnView<'_>> = ordered
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ("07002", "column bound twice".to_string()))?;
        let added = (0..rows)
            .map(|row| {
                ordered
                    .iter()
                    .map(|view| read_bound_cell(view, row))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        table.rows.extend(added);
        Ok(rows)
    }

    fn prepare_insert(&mut self, sql: &str) -> Result<(), Fault> {
        self.cursor = None;
        self.prepared = None;
        let unsupported = || ("42000", format!("unsupported statement: {sql}"));
        let words: Vec<&str> = sql.splitn(4, char::is_whitespace).collect();
        let [insert, into, name, rest] = words.as_slice() else {
            return Err(unsupported());
        };
        if !insert.eq_ignore_ascii_case("insert") || !into.eq_ignore_ascii_case("into") {
            return Err(unsupported());
        }
        let rest = rest.trim_start();
        let markers = rest
            .get(..6)
            .filter(|keyword| keyword.eq_ignore_ascii_case("values"))
            .and_then(|_| rest[6..].trim().strip_prefix('('))
            .and_then(|list| list.strip_suffix(')'))
            .ok_or_else(unsupported)?;
        let placeholders = markers.split(',').map(str::trim).collect::<Vec<_>>();
        if placeholders.iter().any(|marker| *marker != "?") {
            return Err(unsupported());
        }
        let table = self
            .db
            .tables
            .get(*name)
            .ok_or_else(|| ("42S02", format!("table {name} not found")))?;
        if placeholders.len() != table.columns.len() {
            return Err((
                "21S01",
                format!("{} values for {} columns", placeholders.len(), table.columns.len()),
            ));
        }
        self.prepared = Some(Prepared {
            table: name.to_string(),
            params: vec![None; placeholders.len()],
        });
        Ok(())
    }

    fn prepared_table(&self) -> Result<(&Prepared, &StoredTable), Fault> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| ("HY010", "no statement prepared".to_string()))?;
        let table = self
            .db
            .tables
            .get(&prepared.table)
            .ok_or_else(|| ("42S02", format!("table {} not found", prepared.table)))?;
        Ok((prepared, table))
    }

    fn param_index(table: &StoredTable, number: u16) -> Result<usize, Fault> {
        usize::from(number)
            .checked_sub(1)
            .filter(|idx| *idx < table.columns.len())
            .ok_or_else(|| ("07009", format!("invalid parameter number {number}")))
    }

    fn bind_param(&mut self, param: &ParameterView<'_>) -> Result<(), Fault> {
        let (_, table) = self.prepared_table()?;
        let idx = Self::param_index(table, param.number)?;
        if param.c_type != table.c_types[idx] {
            return Err(("07006", format!("parameter {} cannot be bound as {:?}", param.number, param.c_type)));
        }
        let cell = stored_cell(param.c_type, param.data, param.indicator)?;
        if let Some(prepared) = self.prepared.as_mut() {
            prepared.params[idx] = Some(cell);
        }
        Ok(())
    }

    fn execute_insert(&mut self) -> Result<(), Fault> {
        let (prepared, _) = self.prepared_table()?;
        let row = prepared
            .params
            .iter()
            .enumerate()
            .map(|(idx, cell)| cell.clone().ok_or_else(|| ("07002", format!("parameter {} not bound", idx + 1))))
            .collect::<Result<Vec<_>, _>>()?;
        let name = prepared.table.clone();
        if let Some(table) = self.db.tables.get_mut(&name) {
            table.rows.push(row);
        }
        self.last_row_count = 1;
        Ok(())
    }

    fn read(&mut self, column: u16, target: CDataType, buf: &mut [u8]) -> Result<FieldFetch, Fault> {
        let cursor = self.cursor.as_mut().ok_or_else(|| ("24000", "invalid cursor state".to_string()))?;
        let table = self
            .db
            .tables
            .get(&cursor.table)
            .ok_or_else(|| ("42S02", format!("table {} not found", cursor.table)))?;
        let row = cursor
            .position
            .and_then(|pos| table.rows.get(pos))
            .ok_or_else(|| ("24000", "no current row".to_string()))?;
        let idx = usize::from(column)
            .checked_sub(1)
            .filter(|idx| *idx < table.columns.len())
            .ok_or_else(|| ("07009", format!("invalid column number {column}")))?;
        if target != table.c_types[idx] {
            return Err(("07006", format!("column {column} cannot be read as {target:?}")));
        }
        let Some(payload) = &row[idx] else {
            return Ok(FieldFetch {
                ret: SqlReturn::Success,
                indicator: SQL_NULL_DATA,
            });
        };
        if let Some(width) = target.fixed_width() {
            if buf.len() < width {
                return Err(("HY090", format!("buffer of {} bytes for {width}-byte value", buf.len())));
            }
            buf[..width].copy_from_slice(&payload[..width]);
            return Ok(FieldFetch {
                ret: SqlReturn::Success,
                indicator: width as SqlLen,
            });
        }
        let offset = match cursor.consumed[idx] {
            Some(offset) if offset >= payload.len() => {
                return Ok(FieldFetch {
                    ret: SqlReturn::NoData,
                    indicator: 0,
                })
            }
            Some(offset) => offset,
            None => 0,
        };
        let remaining = &payload[offset..];
        let terminator = target.terminator_len();
        let mut capacity = buf.len().saturating_sub(terminator);
        if terminator > 1 {
            capacity -= capacity % terminator;
        }
        let n = remaining.len().min(capacity);
        buf[..n].copy_from_slice(&remaining[..n]);
        if buf.len() >= n + terminator {
            buf[n..n + terminator].fill(0);
        }
        cursor.consumed[idx] = Some(offset + n);
        let ret = if n < remaining.len() {
            SqlReturn::SuccessWithInfo
        } else {
            SqlReturn::Success
        };
        Ok(FieldFetch {
            ret,
            indicator: remaining.len() as SqlLen,
        })
    }
}

fn read_bound_cell(view: &ColumnView<'_>, row: usize) -> Result<Cell, Fault> {
    stored_cell(view.c_type, view.cell(row), view.indicators[row])
        .map_err(|(state, message)| (state, format!("row {row}: {message}")))
}

/// What the driver keeps of one bound buffer.
fn stored_cell(c_type: CDataType, cell: &[u8], indicator: SqlLen) -> Result<Cell, Fault> {
    if indicator == SQL_NULL_DATA {
        return Ok(None);
    }
    if let Some(width) = c_type.fixed_width() {
        if cell.len() < width {
            return Err(("HY090", format!("{} bytes too small for {c_type:?}", cell.len())));
        }
        return Ok(Some(cell[..width].to_vec()));
    }
    let len = match indicator {
        SQL_NTS => terminated_len(cell, c_type.terminator_len()),
        n if n >= 0 && (n as usize) <= cell.len() => n as usize,
        n => return Err(("HY090", format!("invalid length indicator {n}"))),
    };
    Ok(Some(cell[..len].to_vec()))
}

impl DiagnosticSource for LoopbackStatement<'_> {
    fn get_diag_rec(&self, record_number: i16) -> DiagFetch {
        if record_number < 1 {
            return DiagFetch::Failed(SqlReturn::Error);
        }
        match self.diagnostics.get(record_number as usize - 1) {
            Some(record) => DiagFetch::Record(record.clone()),
            None => DiagFetch::NoData,
        }
    }
}

impl FieldSource for LoopbackStatement<'_> {
    fn get_data(&mut self, column: u16, target: CDataType, buf: &mut [u8]) -> FieldFetch {
        if let Some(ret) = self.enter("SQLGetData") {
            return FieldFetch { ret, indicator: 0 };
        }
        match self.read(column, target, buf) {
            Ok(fetch) => {
                if fetch.ret == SqlReturn::SuccessWithInfo {
                    self.diagnostics
                        .push(DiagnosticRecord::new("01004", 0, "string data, right truncated"));
                }
                fetch
            }
            Err(fault) => FieldFetch {
                ret: self.fail(fault),
                indicator: 0,
            },
        }
    }
}

impl NativeStatement for LoopbackStatement<'_> {
    fn exec_direct(&mut self, sql: &str) -> SqlReturn {
        if let Some(ret) = self.enter("SQLExecDirect") {
            return ret;
        }
        match self.exec(sql) {
            Ok(()) => SqlReturn::Success,
            Err(fault) => self.fail(fault),
        }
    }

    fn num_result_cols(&mut self) -> Result<u16, SqlReturn> {
        if let Some(ret) = self.enter("SQLNumResultCols") {
            return Err(ret);
        }
        match self.open_table() {
            Ok(table) => Ok(table.columns.len() as u16),
            Err(fault) => Err(self.fail(fault)),
        }
    }

    fn describe_col(&mut self, column: u16) -> Result<ColumnDescription, SqlReturn> {
        if let Some(ret) = self.enter("SQLDescribeCol") {
            return Err(ret);
        }
        let described = self.open_table().and_then(|table| {
            usize::from(column)
                .checked_sub(1)
                .and_then(|idx| table.columns.get(idx))
                .cloned()
                .ok_or_else(|| ("07009", format!("invalid column number {column}")))
        });
        described.map_err(|fault| self.fail(fault))
    }

    fn fetch(&mut self) -> SqlReturn {
        if let Some(ret) = self.enter("SQLFetch") {
            return ret;
        }
        let rows = match self.open_table() {
            Ok(table) => table.rows.len(),
            Err(fault) => return self.fail(fault),
        };
        let Some(cursor) = self.cursor.as_mut() else {
            return SqlReturn::Error;
        };
        let next = cursor.position.map_or(0, |pos| pos + 1);
        cursor.position = Some(next.min(rows));
        cursor.consumed.iter_mut().for_each(|c| *c = None);
        if next >= rows {
            SqlReturn::NoData
        } else {
            SqlReturn::Success
        }
    }

    fn row_count(&mut self) -> Result<SqlLen, SqlReturn> {
        if let Some(ret) = self.enter("SQLRowCount") {
            return Err(ret);
        }
        Ok(self.last_row_count)
    }

    fn bulk_add(&mut self, columns: &[ColumnView<'_>]) -> SqlReturn {
        if let Some(ret) = self.enter("SQLBulkOperations") {
            return ret;
        }
        match self.append(columns) {
            Ok(rows) => {
                self.last_row_count = rows as SqlLen;
                SqlReturn::Success
            }
            Err(fault) => self.fail(fault),
        }
    }

    fn prepare(&mut self, sql: &str) -> SqlReturn {
        if let Some(ret) = self.enter("SQLPrepare") {
            return ret;
        }
        match self.prepare_insert(sql) {
            Ok(()) => SqlReturn::Success,
            Err(fault) => self.fail(fault),
        }
    }

    fn num_params(&mut self) -> Result<u16, SqlReturn> {
        if let Some(ret) = self.enter("SQLNumParams") {
            return Err(ret);
        }
        match self.prepared_table() {
            Ok((prepared, _)) => Ok(prepared.params.len() as u16),
            Err(fault) => Err(self.fail(fault)),
        }
    }

    fn describe_param(&mut self, param: u16) -> Result<ParamDescription, SqlReturn> {
        if let Some(ret) = self.enter("SQLDescribeParam") {
            return Err(ret);
        }
        let described = self
            .prepared_table()
            .and_then(|(_, table)| Self::param_index(table, param).map(|idx| ParamDescription::from(&table.columns[idx])));
        described.map_err(|fault| self.fail(fault))
    }

    fn bind_parameter(&mut self, param: &ParameterView<'_>) -> SqlReturn {
        if let Some(ret) = self.enter("SQLBindParameter") {
            return ret;
        }
        match self.bind_param(param) {
            Ok(()) => SqlReturn::Success,
            Err(fault) => self.fail(fault),
        }
    }

    fn execute(&mut self) -> SqlReturn {
        if let Some(ret) = self.enter("SQLExecute") {
            return ret;
        }
        match self.execute_insert() {
            Ok(()) => SqlReturn::Success,
            Err(fault) => self.fail(fault),
        }
    }
}
