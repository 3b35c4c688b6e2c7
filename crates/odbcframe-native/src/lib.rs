pub mod binder;
pub mod buffer;
pub mod decoder;
pub mod describe;
pub mod diagnostics;
pub mod loopback;
pub mod params;
pub mod sys;

pub use binder::{bind_table_for_bulk_write, BindOptions, ColumnarBinder};
pub use buffer::{ColumnView, NativeColumnBuffer, ParameterView};
pub use decoder::{decode_result_rows, decode_row, DecodeOptions};
pub use describe::{describe_columns, resolve_columns};
pub use diagnostics::{check, collect as collect_diagnostics, Diagnosis};
pub use loopback::{LoopbackDatabase, LoopbackStatement};
pub use params::{encode_parameter, execute_with_params, insert_statement, ParameterBuffer};
pub use sys::{CDataType, NativeStatement, SqlReturn};
