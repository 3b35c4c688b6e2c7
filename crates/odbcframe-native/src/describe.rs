use crate::diagnostics::collect;
use crate::sys::{NativeStatement, SqlReturn};
use odbcframe_core::catalog::{self, ColumnDescription};
use odbcframe_core::error::OdbcFrameError;
use odbcframe_core::types::ColumnInfo;
use tracing::debug;

/// Describes every column of the statement's open result set.
pub fn describe_columns<S: NativeStatement + ?Sized>(stmt: &mut S) -> Result<Vec<ColumnDescription>, OdbcFrameError> {
    let count = stmt
        .num_result_cols()
        .map_err(|ret| failure(ret, "SQLNumResultCols", &*stmt))?;
    let mut descriptions = Vec::with_capacity(usize::from(count));
    for column in 1..=count {
        let desc = stmt
            .describe_col(column)
            .map_err(|ret| failure(ret, "SQLDescribeCol", &*stmt))?;
        descriptions.push(desc);
    }
    Ok(descriptions)
}

pub(crate) fn failure<S: NativeStatement + ?Sized>(ret: SqlReturn, api_name: &str, stmt: &S) -> OdbcFrameError {
    debug!("{} returned {:?}", api_name, ret);
    collect(api_name, stmt).into()
}

/// Column layout of the open result set.
pub fn resolve_columns<S: NativeStatement + ?Sized>(stmt: &mut S) -> Result<Vec<ColumnInfo>, OdbcFrameError> {
    let descriptions = describe_columns(stmt)?;
    let infos = catalog::resolve(&descriptions)?;
    debug!(
        "resolved {} columns: {}",
        infos.len(),
        infos
            .iter()
            .map(|info| format!("{}:{}", info.name, info.semantic_type))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(infos)
}
