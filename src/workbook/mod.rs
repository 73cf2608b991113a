//! Streaming XLSX workbook writer
//!
//! Append-only by design: rows flow through each worksheet's spill file
//! into the shared ZIP sink, one committed part at a time, so the full
//! workbook never sits in memory.

pub mod workbook;
pub mod worksheet;
pub mod xml;

pub use workbook::Workbook;
pub use worksheet::Worksheet;
