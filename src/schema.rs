//! Column schema and cell value vocabulary for the export

use chrono::NaiveDate;

/// Display format applied to a column's cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    /// No formatting
    General,
    /// Decimal with three places (0.000)
    Decimal3,
    /// Calendar date (yyyy-mm-dd)
    Date,
}

impl CellFormat {
    /// Index of the matching `<xf>` entry in the workbook's cellXfs table
    pub(crate) fn style_index(self) -> u32 {
        match self {
            CellFormat::General => 0,
            CellFormat::Decimal3 => 1,
            CellFormat::Date => 2,
        }
    }
}

/// One column descriptor: header text, record-field key, width, format
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
    pub key: &'static str,
    pub width: f64,
    pub format: CellFormat,
}

/// The fixed seven-column schema of the record dump.
///
/// Built once per run and shared read-only across all sheet tasks.
pub fn report_columns() -> Vec<Column> {
    vec![
        Column {
            header: "ID",
            key: "id",
            width: 22.0,
            format: CellFormat::General,
        },
        Column {
            header: "My String 1",
            key: "myString1",
            width: 22.0,
            format: CellFormat::General,
        },
        Column {
            header: "My Numeric String",
            key: "myNumericString",
            width: 22.0,
            format: CellFormat::General,
        },
        Column {
            header: "My String 2",
            key: "myString2",
            width: 22.0,
            format: CellFormat::General,
        },
        Column {
            header: "Amount",
            key: "amount",
            width: 15.0,
            format: CellFormat::Decimal3,
        },
        Column {
            header: "My Date 1",
            key: "myDate1",
            width: 15.0,
            format: CellFormat::Date,
        },
        Column {
            header: "My Date 2",
            key: "myDate2",
            width: 15.0,
            format: CellFormat::Date,
        },
    ]
}

/// A single cell value as written into a worksheet
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Empty cell (absent optional field)
    Empty,
    /// Inline string
    Text(String),
    /// Plain number
    Number(f64),
    /// Calendar date, stored as an Excel serial number
    Date(NaiveDate),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Number(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_seven_columns_in_declared_order() {
        let columns = report_columns();
        let keys: Vec<&str> = columns.iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            [
                "id",
                "myString1",
                "myNumericString",
                "myString2",
                "amount",
                "myDate1",
                "myDate2"
            ]
        );
    }

    #[test]
    fn formats_map_to_distinct_style_indexes() {
        assert_eq!(CellFormat::General.style_index(), 0);
        assert_eq!(CellFormat::Decimal3.style_index(), 1);
        assert_eq!(CellFormat::Date.style_index(), 2);
    }
}
