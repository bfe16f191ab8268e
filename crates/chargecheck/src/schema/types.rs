//! Core type definitions for column typing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data type of a column, either declared in a rule document or inferred
/// from a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Text/string values.
    #[serde(alias = "str", alias = "utf8")]
    String,
    /// Floating-point numbers.
    #[serde(alias = "float64", alias = "number")]
    Float,
    /// Whole numbers (no decimal point).
    #[serde(rename = "int", alias = "integer", alias = "int64")]
    Integer,
    /// Date only (no time component).
    Date,
    /// Date and time values.
    #[serde(alias = "timestamp")]
    DateTime,
    /// Boolean values (true/false).
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Whether a column of type `self` satisfies a declared `expected` type.
    ///
    /// Integer columns satisfy a float expectation; everything else needs
    /// an exact match.
    pub fn satisfies(&self, expected: ColumnType) -> bool {
        match expected {
            ColumnType::Float => self.is_numeric(),
            other => *self == other,
        }
    }

    /// Name as written in rule documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Float => "float",
            ColumnType::Integer => "int",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Boolean => "bool",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_widening() {
        assert!(ColumnType::Integer.satisfies(ColumnType::Float));
        assert!(ColumnType::Float.satisfies(ColumnType::Float));
        assert!(!ColumnType::Float.satisfies(ColumnType::Integer));
        assert!(!ColumnType::String.satisfies(ColumnType::Float));
    }

    #[test]
    fn test_exact_match_for_non_numeric() {
        assert!(ColumnType::Date.satisfies(ColumnType::Date));
        assert!(!ColumnType::DateTime.satisfies(ColumnType::Date));
        assert!(!ColumnType::Integer.satisfies(ColumnType::String));
    }

    #[test]
    fn test_deserialize_names() {
        let t: ColumnType = serde_json::from_str("\"int\"").unwrap();
        assert_eq!(t, ColumnType::Integer);
        let t: ColumnType = serde_json::from_str("\"bool\"").unwrap();
        assert_eq!(t, ColumnType::Boolean);
        let t: ColumnType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(t, ColumnType::DateTime);
    }
}
