//! Sheet-count configuration from the environment

use crate::error::{ExportError, Result};

/// Environment variable holding the requested worksheet count
pub const N_SHEETS_VAR: &str = "N_SHEETS";

pub const MIN_SHEETS: usize = 1;
pub const MAX_SHEETS: usize = 9;

/// Resolve the worksheet count from `N_SHEETS`.
///
/// Absent or non-numeric values fall back to 1, matching the observed
/// behavior of the exporter this replaces. Numeric values outside
/// `[1, 9]` are a startup-configuration fault.
pub fn sheet_count() -> Result<usize> {
    parse_sheet_count(std::env::var(N_SHEETS_VAR).ok().as_deref())
}

/// Parse a raw `N_SHEETS` value; `None` means the variable is unset.
pub fn parse_sheet_count(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(MIN_SHEETS);
    };
    let Ok(value) = raw.trim().parse::<i64>() else {
        // Garbage strings keep the default rather than failing.
        return Ok(MIN_SHEETS);
    };
    if (MIN_SHEETS as i64..=MAX_SHEETS as i64).contains(&value) {
        Ok(value as usize)
    } else {
        Err(ExportError::Config { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_defaults_to_one() {
        assert_eq!(parse_sheet_count(None).unwrap(), 1);
    }

    #[test]
    fn non_numeric_defaults_to_one() {
        assert_eq!(parse_sheet_count(Some("lots")).unwrap(), 1);
        assert_eq!(parse_sheet_count(Some("")).unwrap(), 1);
        assert_eq!(parse_sheet_count(Some("3.5")).unwrap(), 1);
    }

    #[test]
    fn in_range_values_are_used() {
        for n in 1..=9 {
            assert_eq!(parse_sheet_count(Some(&n.to_string())).unwrap(), n);
        }
        assert_eq!(parse_sheet_count(Some(" 4 ")).unwrap(), 4);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for raw in ["0", "-3", "10", "100"] {
            let err = parse_sheet_count(Some(raw)).unwrap_err();
            assert!(matches!(err, ExportError::Config { .. }), "raw={raw}");
        }
    }
}
