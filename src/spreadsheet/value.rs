use std::fmt::Display;

/// Value held by a single cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum CellValue {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean(bool),
    /// Numeric values, including serial dates
    Number(f64),
    /// Shared, inline and formula result strings
    Text(String),
}

impl CellValue {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Returns the number held by the cell when it is a finite number.
    /// Text that merely looks numeric is not a number.
    pub(crate) fn as_finite_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Renders a number the way spreadsheet labels show it: integral values have no
/// fractional part (`3` rather than `3.0`).
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            CellValue::Number(value) => write!(f, "{}", format_number(*value)),
            CellValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_numbers_only() {
        assert_eq!(CellValue::Number(3.0).as_finite_number(), Some(3.0));
        assert_eq!(CellValue::Number(f64::NAN).as_finite_number(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).as_finite_number(), None);
        assert_eq!(CellValue::from("3").as_finite_number(), None);
        assert_eq!(CellValue::Empty.as_finite_number(), None);
    }

    #[test]
    fn display_matches_spreadsheet_labels() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(-12.0).to_string(), "-12");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::from("Rack 1").to_string(), "Rack 1");
    }
}
