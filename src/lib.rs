//! Winsorization of tabular datasets.
//!
//! This crate provides tools for:
//! - Loading CSV datasets and listing their columns
//! - Clamping selected numeric columns to symmetric nearest-rank percentiles
//! - Reporting min/max/mean before and after the clamp
//! - Rendering before/after box-and-whisker comparisons (PNG)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use winsor_tool::{Session, WinsorConfig};
//!
//! let session = Session::new(WinsorConfig::default());
//! println!("{}", session.list_columns(Path::new("data.csv")));
//!
//! let response = session.process(Path::new("data.csv"), "income, age", 5.0);
//! if let Some(message) = response.error() {
//!     eprintln!("{}", message);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use crate::config::{ArtifactLayout, OutputConfig, PlotConfig, WinsorConfig};
pub use crate::core::loaders::{Column, Table};
pub use crate::processors::{FileSlot, ProcessResponse, Session, StatisticsTable, WinsorError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
