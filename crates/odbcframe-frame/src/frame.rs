use crate::options::FrameOptions;
use odbcframe_core::catalog::align;
use odbcframe_core::error::OdbcFrameError;
use odbcframe_core::table::Table;
use odbcframe_core::types::Value;
use odbcframe_native::{
    check, decode_result_rows, execute_with_params, insert_statement, resolve_columns, ColumnView, ColumnarBinder,
    NativeColumnBuffer, NativeStatement, SqlReturn,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What `write_table` does when the target already holds rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Add the rows after the existing ones.
    #[default]
    Append,
    /// Delete existing rows first.
    Overwrite,
    /// Leave a non-empty target untouched.
    Ignore,
    /// Fail on a non-empty target.
    ErrorIfExists,
}

/// Reads every row of `table_name` into a table named after it.
pub fn read_table<S: NativeStatement + ?Sized>(
    stmt: &mut S,
    table_name: &str,
    options: &FrameOptions,
) -> Result<Table, OdbcFrameError> {
    select_all(stmt, table_name)?;
    let infos = resolve_columns(stmt)?;
    let mut table = decode_result_rows(stmt, &infos, &options.decode)?;
    table.set_name(table_name);
    info!(
        "read {} rows, {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        table_name
    );
    Ok(table)
}

/// Bulk-writes `table` into `target`, returning the number of rows added.
///
/// Column types and sizes come from the target's own description; the
/// table's values are coerced to them.
pub fn write_table<S: NativeStatement + ?Sized>(
    stmt: &mut S,
    table: &Table,
    target: &str,
    mode: SaveMode,
    options: &FrameOptions,
) -> Result<usize, OdbcFrameError> {
    match mode {
        SaveMode::Append => {}
        SaveMode::Overwrite => {
            let sql = format!("DELETE FROM {target}");
            check(stmt.exec_direct(&sql), "SQLExecDirect", &*stmt)?;
            debug!("cleared {} before overwrite", target);
        }
        SaveMode::Ignore | SaveMode::ErrorIfExists => {
            if has_rows(stmt, target)? {
                if mode == SaveMode::Ignore {
                    info!("{} already has rows, skipping write", target);
                    return Ok(0);
                }
                return Err(OdbcFrameError::TableNotEmpty {
                    table: target.to_string(),
                });
            }
        }
    }

    select_all(stmt, target)?;
    let layout = align(table.columns(), resolve_columns(stmt)?)?;
    if table.num_rows() == 0 {
        debug!("nothing to write into {}", target);
        return Ok(0);
    }
    let mut binder = ColumnarBinder::new(options.bind);
    let buffers = binder.bind(table, &layout)?;
    let views: Vec<ColumnView<'_>> = buffers.iter().map(NativeColumnBuffer::view).collect();
    check(stmt.bulk_add(&views), "SQLBulkOperations", &*stmt)?;
    info!(
        "wrote {} rows into {} ({:?}, {} buffers)",
        table.num_rows(),
        target,
        mode,
        binder.buffers_allocated()
    );
    Ok(table.num_rows())
}

/// Inserts one row into `target` through a prepared statement with one
/// parameter per value.
pub fn insert_row<S: NativeStatement + ?Sized>(
    stmt: &mut S,
    target: &str,
    values: &[Value],
) -> Result<usize, OdbcFrameError> {
    let sql = insert_statement(target, values.len());
    let added = execute_with_params(stmt, &sql, values)?;
    debug!("inserted {} row(s) into {}", added, target);
    Ok(added)
}

fn select_all<S: NativeStatement + ?Sized>(stmt: &mut S, table_name: &str) -> Result<(), OdbcFrameError> {
    let sql = format!("SELECT * FROM {table_name}");
    check(stmt.exec_direct(&sql), "SQLExecDirect", &*stmt)
}

fn has_rows<S: NativeStatement + ?Sized>(stmt: &mut S, table_name: &str) -> Result<bool, OdbcFrameError> {
    select_all(stmt, table_name)?;
    match stmt.fetch() {
        SqlReturn::NoData => Ok(false),
        ret => check(ret, "SQLFetch", &*stmt).map(|()| true),
    }
}
