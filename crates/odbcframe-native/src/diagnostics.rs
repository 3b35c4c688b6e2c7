use crate::sys::{DiagFetch, DiagnosticSource, SqlReturn};
use metrics::counter;
use odbcframe_core::error::{DiagnosticRecord, DiagnosticSet, OdbcFrameError};
use tracing::warn;

/// What a native diagnostic chain says about a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    Failed(DiagnosticSet),
    /// The handle is unusable; carries the `08S01` record.
    ConnectionLost {
        api_name: String,
        record: DiagnosticRecord,
    },
}

impl From<Diagnosis> for OdbcFrameError {
    fn from(diagnosis: Diagnosis) -> Self {
        match diagnosis {
            Diagnosis::Failed(diagnostics) => OdbcFrameError::NativeCallFailed {
                api_name: diagnostics.api_name().to_string(),
                diagnostics,
            },
            Diagnosis::ConnectionLost { api_name, record } => {
                OdbcFrameError::ConnectionLost { api_name, record }
            }
        }
    }
}

/// Walks the diagnostic records of `source` starting at record 1.
pub fn collect<S: DiagnosticSource + ?Sized>(api_name: &str, source: &S) -> Diagnosis {
    let mut records = Vec::new();
    for record_number in 1..=i16::MAX {
        match source.get_diag_rec(record_number) {
            DiagFetch::Record(record) => {
                if record.is_connection_lost() {
                    counter!("odbc_connection_lost").increment(1);
                    return Diagnosis::ConnectionLost {
                        api_name: api_name.to_string(),
                        record,
                    };
                }
                records.push(record);
            }
            DiagFetch::NoData => break,
            DiagFetch::Failed(ret) => {
                warn!(
                    "{}: diagnostic record {} unavailable ({:?}), keeping {} records",
                    api_name,
                    record_number,
                    ret,
                    records.len()
                );
                break;
            }
        }
    }
    counter!("odbc_diagnostic_records").increment(records.len() as u64);
    Diagnosis::Failed(DiagnosticSet::new(api_name, records))
}

/// Turns a failed return code into the error described by `source`.
pub fn check<S: DiagnosticSource + ?Sized>(
    ret: SqlReturn,
    api_name: &str,
    source: &S,
) -> Result<(), OdbcFrameError> {
    if ret.is_success() {
        Ok(())
    } else {
        Err(collect(api_name, source).into())
    }
}
