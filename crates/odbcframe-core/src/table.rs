use crate::error::OdbcFrameError;
use crate::types::{ColumnInfo, Row, SemanticType, Value};
use serde::{Deserialize, Serialize};

/// Row-major table with a per-column type fixed by the first non-null value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    name: Option<String>,
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(ordinal, column)| ColumnInfo { ordinal, ..column })
            .collect();
        Self {
            name: None,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_column_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(names.iter().map(|n| ColumnInfo::new(n.as_ref())).collect())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn add_row(&mut self, values: Vec<Value>) -> Result<(), OdbcFrameError> {
        self.push_row(Row::new(values))
    }

    pub fn push_row(&mut self, row: Row) -> Result<(), OdbcFrameError> {
        if row.len() != self.columns.len() {
            return Err(OdbcFrameError::RowColumnCountMismatch {
                row: Some(self.rows.len()),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(&row.values) {
            if let Some(found) = value.natural_type() {
                if column.semantic_type != SemanticType::Unknown && column.semantic_type != found {
                    return Err(OdbcFrameError::TypeMismatch {
                        ordinal: column.ordinal,
                        expected: column.semantic_type,
                        found,
                    });
                }
            }
        }
        for (column, value) in self.columns.iter_mut().zip(&row.values) {
            if column.semantic_type == SemanticType::Unknown {
                if let Some(found) = value.natural_type() {
                    column.semantic_type = found;
                }
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, ordinal: usize) -> Option<Vec<&Value>> {
        if ordinal >= self.columns.len() {
            return None;
        }
        Some(self.rows.iter().map(|row| &row.values[ordinal]).collect())
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Drops all rows; inferred column types stay fixed.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
