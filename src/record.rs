//! The input record type and its projection onto the column schema

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ExportError, Result};
use crate::schema::{Cell, Column};

/// One flat object from the input array.
///
/// Shape is not validated beyond deserialization: `myNumericString` and
/// `myString2` may be absent, dates arrive as ISO `yyyy-mm-dd` strings and
/// are only parsed when a row is written.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(rename = "myString1")]
    pub my_string_1: String,
    #[serde(rename = "myNumericString")]
    pub my_numeric_string: Option<String>,
    #[serde(rename = "myString2")]
    pub my_string_2: Option<String>,
    pub amount: f64,
    #[serde(rename = "myDate1")]
    pub my_date_1: String,
    #[serde(rename = "myDate2")]
    pub my_date_2: String,
}

impl Record {
    /// Look up the cell value for one column key.
    pub fn field(&self, key: &str) -> Result<Cell> {
        match key {
            "id" => Ok(Cell::Number(self.id as f64)),
            "myString1" => Ok(Cell::Text(self.my_string_1.clone())),
            "myNumericString" => Ok(match &self.my_numeric_string {
                Some(s) => Cell::Text(s.clone()),
                None => Cell::Empty,
            }),
            "myString2" => Ok(match &self.my_string_2 {
                Some(s) => Cell::Text(s.clone()),
                None => Cell::Empty,
            }),
            "amount" => Ok(Cell::Number(self.amount)),
            "myDate1" => parse_date(&self.my_date_1),
            "myDate2" => parse_date(&self.my_date_2),
            other => Err(ExportError::Write(format!("unknown column key '{other}'"))),
        }
    }

    /// Project the record onto the schema, one cell per column, in order.
    pub fn cells(&self, columns: &[Column]) -> Result<Vec<Cell>> {
        columns.iter().map(|col| self.field(col.key)).collect()
    }
}

fn parse_date(raw: &str) -> Result<Cell> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Cell::Date)
        .map_err(|err| ExportError::Write(format!("invalid date '{raw}': {err}")))
}
