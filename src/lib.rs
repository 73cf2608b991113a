//! # sheetstream
//!
//! Streaming export of gzip-compressed JSON record dumps into
//! multi-sheet XLSX workbooks.
//!
//! ## Features
//!
//! - **Streaming Write**: rows are flushed to disk as they are produced,
//!   the workbook is never held in memory
//! - **Concurrent Sheets**: the requested worksheets are written by
//!   cooperative tasks on a single thread, joined before the workbook
//!   is finalized
//! - **Fixed Schema**: the seven-column record layout with decimal and
//!   date display formats
//! - **Fail Fast**: any load or write failure aborts the run, no partial
//!   workbook is finalized
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheetstream::{loader, writer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> sheetstream::Result<()> {
//!     let records = loader::load("../input.json.gzip")?;
//!     writer::write_workbook("demo.xlsx", &records, 3).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod record;
pub mod schema;
pub mod workbook;
pub mod writer;

pub use error::{ExportError, Result};
pub use record::Record;
pub use schema::{report_columns, Cell, CellFormat, Column};
pub use workbook::{Workbook, Worksheet};
