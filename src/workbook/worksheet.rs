//! Per-sheet streaming handle
//!
//! Each worksheet streams its row XML into a private spill file so that
//! concurrently written sheets never interleave inside one ZIP entry. On
//! commit the finished part is copied into the owning workbook's ZIP sink
//! and the spill file is dropped.

use std::cell::RefCell;
use std::io::Seek;
use std::rc::Rc;

use chrono::NaiveDate;
use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::workbook::WorkbookInner;
use super::xml::escape_into;
use crate::error::{ExportError, Result};
use crate::schema::{Cell, Column};

const XML_DECL: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const WORKSHEET_OPEN: &[u8] = b"<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">";

/// Streaming writer for one worksheet of a [`super::Workbook`].
///
/// Rows become visible in append order; once [`Worksheet::commit`] has run
/// they cannot be revisited.
pub struct Worksheet {
    workbook: Rc<RefCell<WorkbookInner>>,
    name: String,
    columns: Vec<Column>,
    spill: BufWriter<AsyncFile>,
    row_buf: Vec<u8>,
    current_row: u32,
}

impl std::fmt::Debug for Worksheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worksheet")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("current_row", &self.current_row)
            .finish_non_exhaustive()
    }
}

impl Worksheet {
    /// Open a registered worksheet: create the spill file and write the
    /// sheet prologue (column widths, header row). Called by
    /// `Workbook::add_worksheet`.
    pub(crate) async fn open(
        workbook: Rc<RefCell<WorkbookInner>>,
        name: String,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let spill = tempfile::tempfile().map_err(|err| {
            ExportError::Write(format!("failed to open spill file for '{name}': {err}"))
        })?;
        let spill = BufWriter::new(AsyncFile::from_std(spill));

        let mut sheet = Worksheet {
            workbook,
            name,
            columns,
            spill,
            row_buf: Vec::with_capacity(4096),
            current_row: 0,
        };
        sheet.write_prologue().await?;
        Ok(sheet)
    }

    /// Worksheet name (`Sheet1`..`SheetN`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of data rows appended so far (the header row not counted)
    pub fn row_count(&self) -> u32 {
        self.current_row.saturating_sub(1)
    }

    async fn write_prologue(&mut self) -> Result<()> {
        self.row_buf.clear();
        self.row_buf.extend_from_slice(XML_DECL);
        self.row_buf.extend_from_slice(WORKSHEET_OPEN);

        self.row_buf.extend_from_slice(b"<cols>");
        let mut digits = itoa::Buffer::new();
        for (idx, col) in self.columns.iter().enumerate() {
            let number = digits.format(idx as u32 + 1).as_bytes().to_vec();
            self.row_buf.extend_from_slice(b"<col min=\"");
            self.row_buf.extend_from_slice(&number);
            self.row_buf.extend_from_slice(b"\" max=\"");
            self.row_buf.extend_from_slice(&number);
            self.row_buf.extend_from_slice(b"\" width=\"");
            self.row_buf
                .extend_from_slice(col.width.to_string().as_bytes());
            self.row_buf.extend_from_slice(b"\" customWidth=\"1\"/>");
        }
        self.row_buf.extend_from_slice(b"</cols><sheetData>");

        self.flush_row_buf().await?;

        // Header row from the schema, unformatted
        let headers: Vec<Cell> = self
            .columns
            .iter()
            .map(|col| Cell::Text(col.header.to_string()))
            .collect();
        self.write_row(&headers, false).await
    }

    /// Append one data row mapping the given cells onto the schema's
    /// column formats, then hand the bytes to the spill writer. The await
    /// is the task's suspension point, and the row buffer is released
    /// before the next row is built.
    pub async fn append_row(&mut self, cells: &[Cell]) -> Result<()> {
        self.write_row(cells, true).await
    }

    async fn write_row(&mut self, cells: &[Cell], formatted: bool) -> Result<()> {
        self.current_row += 1;
        let row = self.current_row;

        self.row_buf.clear();
        let mut digits = itoa::Buffer::new();
        self.row_buf.extend_from_slice(b"<row r=\"");
        self.row_buf
            .extend_from_slice(digits.format(row).as_bytes());
        self.row_buf.extend_from_slice(b"\">");

        for (idx, cell) in cells.iter().enumerate() {
            let style = if formatted {
                self.columns
                    .get(idx)
                    .map(|col| col.format.style_index())
                    .unwrap_or(0)
            } else {
                0
            };
            push_cell(&mut self.row_buf, row, idx as u32 + 1, style, cell);
        }

        self.row_buf.extend_from_slice(b"</row>");
        self.flush_row_buf().await
    }

    async fn flush_row_buf(&mut self) -> Result<()> {
        let row = self.current_row;
        self.spill
            .write_all(&self.row_buf)
            .await
            .map_err(|err| ExportError::WriteRow {
                row,
                sheet: self.name.clone(),
                detail: err.to_string(),
            })?;
        self.row_buf.clear();
        Ok(())
    }

    /// Finalize the worksheet: close the sheet XML, rewind the spill file
    /// and copy it into the workbook's ZIP sink as `xl/worksheets/sheetN.xml`.
    pub async fn commit(mut self) -> Result<()> {
        self.row_buf.clear();
        self.row_buf.extend_from_slice(b"</sheetData></worksheet>");
        self.flush_row_buf().await?;

        self.spill
            .flush()
            .await
            .map_err(|err| commit_error(&self.name, &err))?;

        let mut spill = self.spill.into_inner().into_std().await;
        spill
            .rewind()
            .map_err(|err| commit_error(&self.name, &err))?;

        // Brief synchronous borrow; never held across an await.
        let mut workbook = self.workbook.borrow_mut();
        workbook.attach_sheet(&self.name, &mut spill)
    }
}

fn commit_error(name: &str, err: &dyn std::fmt::Display) -> ExportError {
    ExportError::Write(format!("failed to commit worksheet '{name}': {err}"))
}

/// Append one `<c>` element to `buf`.
fn push_cell(buf: &mut Vec<u8>, row: u32, col: u32, style: u32, cell: &Cell) {
    let mut digits = itoa::Buffer::new();

    buf.extend_from_slice(b"<c r=\"");
    push_col_letters(buf, col);
    buf.extend_from_slice(digits.format(row).as_bytes());
    buf.push(b'"');
    if style != 0 {
        buf.extend_from_slice(b" s=\"");
        buf.extend_from_slice(digits.format(style).as_bytes());
        buf.push(b'"');
    }

    match cell {
        Cell::Empty => buf.extend_from_slice(b"/>"),
        Cell::Text(text) => {
            buf.extend_from_slice(b" t=\"inlineStr\"><is><t>");
            escape_into(buf, text);
            buf.extend_from_slice(b"</t></is></c>");
        }
        Cell::Number(value) => {
            buf.extend_from_slice(b"><v>");
            buf.extend_from_slice(value.to_string().as_bytes());
            buf.extend_from_slice(b"</v></c>");
        }
        Cell::Date(date) => {
            buf.extend_from_slice(b"><v>");
            buf.extend_from_slice(digits.format(date_serial(*date)).as_bytes());
            buf.extend_from_slice(b"</v></c>");
        }
    }
}

/// Append the column letters for a 1-based column index (A, B, .., Z, AA, ..)
fn push_col_letters(buf: &mut Vec<u8>, mut col: u32) {
    let mut letters = [0u8; 7];
    let mut n = 0;
    while col > 0 {
        letters[n] = b'A' + ((col - 1) % 26) as u8;
        n += 1;
        col = (col - 1) / 26;
    }
    while n > 0 {
        n -= 1;
        buf.push(letters[n]);
    }
}

/// Excel serial day number; day 0 is 1899-12-30 (the 1900 leap-year bug
/// folded into the epoch).
fn date_serial(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("fixed epoch date");
    date.signed_duration_since(epoch).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(col: u32) -> String {
        let mut buf = Vec::new();
        push_col_letters(&mut buf, col);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn column_letters() {
        assert_eq!(letters(1), "A");
        assert_eq!(letters(7), "G");
        assert_eq!(letters(26), "Z");
        assert_eq!(letters(27), "AA");
        assert_eq!(letters(702), "ZZ");
        assert_eq!(letters(703), "AAA");
    }

    #[test]
    fn date_serials_match_excel() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(date_serial(d(2023, 1, 1)), 44927);
        assert_eq!(date_serial(d(2024, 1, 1)), 45292);
        assert_eq!(date_serial(d(2024, 1, 2)), 45293);
    }

    #[test]
    fn cells_render_inline_strings_numbers_and_dates() {
        let mut buf = Vec::new();
        push_cell(&mut buf, 2, 1, 0, &Cell::Text("a<b".to_string()));
        push_cell(&mut buf, 2, 5, 1, &Cell::Number(12.5));
        push_cell(
            &mut buf,
            2,
            6,
            2,
            &Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        );
        push_cell(&mut buf, 2, 4, 0, &Cell::Empty);

        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<c r=\"A2\" t=\"inlineStr\"><is><t>a&lt;b</t></is></c>"));
        assert!(xml.contains("<c r=\"E2\" s=\"1\"><v>12.5</v></c>"));
        assert!(xml.contains("<c r=\"F2\" s=\"2\"><v>45292</v></c>"));
        assert!(xml.contains("<c r=\"D2\"/>"));
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        let mut buf = Vec::new();
        push_cell(&mut buf, 2, 1, 0, &Cell::Number(1.0));
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "<c r=\"A2\"><v>1</v></c>"
        );
    }
}
