pub mod frame;
pub mod options;

pub use frame::{insert_row, read_table, write_table, SaveMode};
pub use options::FrameOptions;
