//! Core data types and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{load_table, CellValue, Column, LoaderError, Table};
pub use transforms::{winsorize_column, ClampBounds, Summary, TransformError, WinsorizedColumn};
pub use writers::{write_table_csv, WriteError};
