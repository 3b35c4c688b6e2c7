use crate::error::OdbcFrameError;
use crate::temporal::{DATE_STRUCT_LEN, TIMESTAMP_STRUCT_LEN, TIME_STRUCT_LEN};
use crate::types::{ColumnInfo, Nullability, SemanticType};
use serde::{Deserialize, Serialize};

/// SQL data type codes as reported by `SQLDescribeCol`.
pub mod sql_type {
    pub const UNKNOWN: i16 = 0;
    pub const CHAR: i16 = 1;
    pub const NUMERIC: i16 = 2;
    pub const DECIMAL: i16 = 3;
    pub const INTEGER: i16 = 4;
    pub const SMALLINT: i16 = 5;
    pub const FLOAT: i16 = 6;
    pub const REAL: i16 = 7;
    pub const DOUBLE: i16 = 8;
    pub const DATETIME: i16 = 9;
    pub const TIME: i16 = 10;
    pub const TIMESTAMP: i16 = 11;
    pub const VARCHAR: i16 = 12;
    pub const BOOLEAN: i16 = 16;
    pub const TYPE_DATE: i16 = 91;
    pub const TYPE_TIME: i16 = 92;
    pub const TYPE_TIMESTAMP: i16 = 93;
    pub const LONGVARCHAR: i16 = -1;
    pub const BINARY: i16 = -2;
    pub const VARBINARY: i16 = -3;
    pub const LONGVARBINARY: i16 = -4;
    pub const BIGINT: i16 = -5;
    pub const TINYINT: i16 = -6;
    pub const BIT: i16 = -7;
    pub const WCHAR: i16 = -8;
    pub const WVARCHAR: i16 = -9;
    pub const WLONGVARCHAR: i16 = -10;
    pub const GUID: i16 = -11;
    pub const SS_XML: i16 = -152;
}

/// One result-set column as the driver describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub sql_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, sql_type: i16, column_size: usize) -> Self {
        Self {
            name: name.into(),
            sql_type,
            column_size,
            decimal_digits: 0,
            nullable: Nullability::Unknown,
        }
    }
}

/// One statement parameter as `SQLDescribeParam` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescription {
    pub sql_type: i16,
    pub parameter_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

impl From<&ColumnDescription> for ParamDescription {
    fn from(desc: &ColumnDescription) -> Self {
        Self {
            sql_type: desc.sql_type,
            parameter_size: desc.column_size,
            decimal_digits: desc.decimal_digits,
            nullable: desc.nullable,
        }
    }
}

/// Semantic type and native cell width for a SQL type code.
///
/// Numeric and decimal columns travel as character data so no precision is
/// lost in a float round trip.
pub fn layout_for(sql_type: i16, declared_size: usize) -> Option<(SemanticType, usize)> {
    use sql_type::*;
    let layout = match sql_type {
        BIT | BOOLEAN => (SemanticType::Bool, 1),
        TINYINT | SMALLINT | INTEGER => (SemanticType::Int32, 4),
        BIGINT => (SemanticType::Int64, 8),
        REAL | FLOAT | DOUBLE => (SemanticType::Float64, 8),
        NUMERIC | DECIMAL => (SemanticType::FixedString, declared_size),
        CHAR | VARCHAR => (SemanticType::FixedString, declared_size + 1),
        WCHAR | WVARCHAR => (SemanticType::WideString, (declared_size + 1) * 2),
        BINARY | VARBINARY => (SemanticType::Binary, declared_size),
        LONGVARCHAR => (SemanticType::VariableString, 0),
        WLONGVARCHAR | SS_XML => (SemanticType::WideString, 0),
        LONGVARBINARY => (SemanticType::Binary, 0),
        TYPE_TIMESTAMP | TIMESTAMP => (SemanticType::Timestamp, TIMESTAMP_STRUCT_LEN),
        TYPE_DATE | DATETIME => (SemanticType::Date, DATE_STRUCT_LEN),
        TYPE_TIME | TIME => (SemanticType::Time, TIME_STRUCT_LEN),
        GUID => (SemanticType::Guid, 16),
        _ => return None,
    };
    Some(layout)
}

pub fn resolve(descriptions: &[ColumnDescription]) -> Result<Vec<ColumnInfo>, OdbcFrameError> {
    descriptions
        .iter()
        .enumerate()
        .map(|(ordinal, desc)| resolve_one(ordinal, desc))
        .collect()
}

pub fn resolve_one(ordinal: usize, desc: &ColumnDescription) -> Result<ColumnInfo, OdbcFrameError> {
    let (semantic_type, native_size) = layout_for(desc.sql_type, desc.column_size).ok_or(
        OdbcFrameError::UnsupportedType {
            ordinal,
            sql_type: desc.sql_type,
        },
    )?;
    Ok(ColumnInfo {
        name: desc.name.clone(),
        semantic_type,
        native_size,
        ordinal,
        nullable: desc.nullable,
        sql_type: desc.sql_type,
    })
}

/// Layout of a parameter; `ordinal` is 0-based.
pub fn resolve_param(ordinal: usize, desc: &ParamDescription) -> Result<ColumnInfo, OdbcFrameError> {
    resolve_one(
        ordinal,
        &ColumnDescription {
            name: format!("param{}", ordinal + 1),
            sql_type: desc.sql_type,
            column_size: desc.parameter_size,
            decimal_digits: desc.decimal_digits,
            nullable: desc.nullable,
        },
    )
}

/// Lays a table's columns over the layout resolved from the write target.
///
/// Column names given by the table win; types and sizes come from the target.
pub fn align(table_columns: &[ColumnInfo], resolved: Vec<ColumnInfo>) -> Result<Vec<ColumnInfo>, OdbcFrameError> {
    if table_columns.len() != resolved.len() {
        return Err(OdbcFrameError::RowColumnCountMismatch {
            row: None,
            expected: resolved.len(),
            found: table_columns.len(),
        });
    }
    Ok(table_columns
        .iter()
        .zip(resolved)
        .map(|(ours, target)| ColumnInfo {
            name: if ours.name.is_empty() {
                target.name
            } else {
                ours.name.clone()
            },
            ..target
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::sql_type::*;
    use super::*;

    #[test]
    fn mapping_table_is_exact() {
        let cases: &[(i16, usize, SemanticType, usize)] = &[
            (BIT, 1, SemanticType::Bool, 1),
            (BOOLEAN, 1, SemanticType::Bool, 1),
            (TINYINT, 3, SemanticType::Int32, 4),
            (SMALLINT, 5, SemanticType::Int32, 4),
            (INTEGER, 10, SemanticType::Int32, 4),
            (BIGINT, 19, SemanticType::Int64, 8),
            (REAL, 7, SemanticType::Float64, 8),
            (FLOAT, 15, SemanticType::Float64, 8),
            (DOUBLE, 15, SemanticType::Float64, 8),
            (NUMERIC, 12, SemanticType::FixedString, 12),
            (DECIMAL, 20, SemanticType::FixedString, 20),
            (CHAR, 10, SemanticType::FixedString, 11),
            (VARCHAR, 255, SemanticType::FixedString, 256),
            (WCHAR, 10, SemanticType::WideString, 22),
            (WVARCHAR, 100, SemanticType::WideString, 202),
            (BINARY, 16, SemanticType::Binary, 16),
            (VARBINARY, 64, SemanticType::Binary, 64),
            (LONGVARCHAR, 0, SemanticType::VariableString, 0),
            (WLONGVARCHAR, 0, SemanticType::WideString, 0),
            (SS_XML, 0, SemanticType::WideString, 0),
            (LONGVARBINARY, 0, SemanticType::Binary, 0),
            (TYPE_TIMESTAMP, 26, SemanticType::Timestamp, 16),
            (TIMESTAMP, 26, SemanticType::Timestamp, 16),
            (TYPE_DATE, 10, SemanticType::Date, 6),
            (DATETIME, 10, SemanticType::Date, 6),
            (TYPE_TIME, 8, SemanticType::Time, 6),
            (TIME, 8, SemanticType::Time, 6),
            (GUID, 36, SemanticType::Guid, 16),
        ];
        for (code, declared, ty, size) in cases {
            assert_eq!(layout_for(*code, *declared), Some((*ty, *size)), "sql type {code}");
        }
    }

    #[test]
    fn unknown_codes_are_rejected_with_ordinal() {
        let descs = vec![
            ColumnDescription::new("id", INTEGER, 10),
            ColumnDescription::new("geom", -151, 0),
        ];
        match resolve(&descs) {
            Err(OdbcFrameError::UnsupportedType { ordinal, sql_type }) => {
                assert_eq!(ordinal, 1);
                assert_eq!(sql_type, -151);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(layout_for(UNKNOWN, 0).is_none());
    }

    #[test]
    fn resolve_is_idempotent_and_dense() {
        let descs = vec![
            ColumnDescription::new("id", BIGINT, 19),
            ColumnDescription::new("name", WVARCHAR, 40),
            ColumnDescription::new("body", LONGVARCHAR, 0),
        ];
        let first = resolve(&descs).expect("resolve");
        let second = resolve(&descs).expect("resolve");
        assert_eq!(first, second);
        let ordinals: Vec<usize> = first.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert!(first[2].is_unbounded());
    }

    #[test]
    fn align_keeps_table_names_and_target_layout() {
        let ours = vec![ColumnInfo::new("user_id"), ColumnInfo::new("")];
        let target = resolve(&[
            ColumnDescription::new("ID", INTEGER, 10),
            ColumnDescription::new("NAME", VARCHAR, 20),
        ])
        .expect("resolve");
        let aligned = align(&ours, target).expect("align");
        assert_eq!(aligned[0].name, "user_id");
        assert_eq!(aligned[0].semantic_type, SemanticType::Int32);
        assert_eq!(aligned[1].name, "NAME");
        assert_eq!(aligned[1].native_size, 21);
        assert_eq!(aligned[1].ordinal, 1);
    }

    #[test]
    fn numeric_text_has_room_beyond_precision() {
        let infos = resolve(&[
            ColumnDescription::new("amount", NUMERIC, 5),
            ColumnDescription::new("code", VARCHAR, 5),
        ])
        .expect("resolve");
        assert_eq!(infos[0].native_size, 5);
        assert_eq!(infos[0].text_capacity(), 8);
        assert_eq!(infos[1].text_capacity(), 6);
        assert_eq!(ColumnInfo::new("inferred").sql_type, UNKNOWN);
    }

    #[test]
    fn params_resolve_like_columns() {
        let desc = ParamDescription::from(&ColumnDescription::new("at", TYPE_TIME, 8));
        let info = resolve_param(2, &desc).expect("resolve");
        assert_eq!(info.name, "param3");
        assert_eq!(info.ordinal, 2);
        assert_eq!((info.semantic_type, info.sql_type), (SemanticType::Time, TYPE_TIME));
        let unknown = ParamDescription::from(&ColumnDescription::new("geo", -151, 0));
        assert!(matches!(
            resolve_param(0, &unknown),
            Err(OdbcFrameError::UnsupportedType { ordinal: 0, sql_type: -151 })
        ));
    }

    #[test]
    fn align_rejects_width_mismatch() {
        let ours = vec![ColumnInfo::new("a")];
        let target = resolve(&[
            ColumnDescription::new("a", INTEGER, 10),
            ColumnDescription::new("b", INTEGER, 10),
        ])
        .expect("resolve");
        assert!(matches!(
            align(&ours, target),
            Err(OdbcFrameError::RowColumnCountMismatch {
                row: None,
                expected: 2,
                found: 1
            })
        ));
    }
}
