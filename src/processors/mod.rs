//! Request processing: selection parsing, winsorization and the session triggers.

pub mod artifacts;
pub mod columns;
pub mod selection;
pub mod session;
pub mod winsorizer;

// Re-export key types for convenience
pub use artifacts::{ArtifactPaths, ArtifactStore};
pub use columns::list_columns;
pub use selection::{ClampLevel, ColumnSelection, SelectionError};
pub use session::{FileSlot, ProcessResponse, Session};
pub use winsorizer::{
    winsorize_file, winsorize_table, Phase, StatisticsRecord, StatisticsTable, WinsorError,
    Winsorization, WinsorizeOutput,
};
