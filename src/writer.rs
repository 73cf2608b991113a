//! Workbook orchestration: one writer task per worksheet
//!
//! The tasks share the record slice and the column schema read-only and
//! interleave cooperatively on a current-thread runtime; the join below
//! is the only barrier, and the workbook is finalized strictly after it.

use std::path::Path;

use futures::future::try_join_all;

use crate::error::Result;
use crate::record::Record;
use crate::schema::{self, Column};
use crate::workbook::Workbook;

/// Write `records` into `n_sheets` identical worksheets of a workbook at
/// `path`.
///
/// The sheet count must already be validated (`config::sheet_count`).
/// If any sheet task fails the error propagates and the workbook is
/// never finalized; no partial output is guaranteed usable.
pub async fn write_workbook<P: AsRef<Path>>(
    path: P,
    records: &[Record],
    n_sheets: usize,
) -> Result<()> {
    let workbook = Workbook::create(path)?;
    let columns = schema::report_columns();

    let tasks = (1..=n_sheets).map(|index| write_sheet(&workbook, index, &columns, records));
    try_join_all(tasks).await?;

    workbook.finish()
}

/// Write one worksheet: create `Sheet<index>`, append every record as a
/// row in input order, then commit the sheet.
pub async fn write_sheet(
    workbook: &Workbook,
    index: usize,
    columns: &[Column],
    records: &[Record],
) -> Result<()> {
    let mut sheet = workbook
        .add_worksheet(&format!("Sheet{index}"), columns)
        .await?;

    for record in records {
        let cells = record.cells(columns)?;
        sheet.append_row(&cells).await?;
    }

    sheet.commit().await
}
