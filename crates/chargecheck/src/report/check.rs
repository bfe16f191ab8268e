//! Per-rule check results.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// The rule could not be evaluated.
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Error => "error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a failing check matters to a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// A failing row rendered as column name to value, nulls as JSON null.
pub type RowSample = IndexMap<String, Value>;

/// Result of evaluating a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Rule identifier, e.g. `not_null.code`.
    pub rule: String,
    pub status: CheckStatus,
    pub severity: Severity,
    /// Human-readable summary.
    pub message: String,
    /// Structured evidence: counts, offending values, parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    /// Bounded sample of offending rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_rows: Vec<RowSample>,
}

impl CheckResult {
    pub fn new(
        rule: impl Into<String>,
        status: CheckStatus,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            status,
            severity,
            message: message.into(),
            details: Map::new(),
            failing_rows: Vec::new(),
        }
    }

    pub fn pass(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(rule, CheckStatus::Pass, severity, message)
    }

    pub fn fail(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(rule, CheckStatus::Fail, severity, message)
    }

    /// A rule that raised while evaluating. The error text is kept in
    /// both the message and `details.error`.
    pub fn error(rule: impl Into<String>, severity: Severity, error: impl fmt::Display) -> Self {
        let text = error.to_string();
        Self::new(rule, CheckStatus::Error, severity, format!("Error evaluating rule: {text}"))
            .with_detail("error", text)
    }

    /// Add one structured detail.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Set the failing-row sample.
    pub fn with_failing_rows(mut self, rows: Vec<RowSample>) -> Self {
        self.failing_rows = rows;
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let result = CheckResult::fail("not_null.code", Severity::Error, "3 rows have null code")
            .with_detail("column", "code")
            .with_detail("null_count", 3);

        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.details["null_count"], 3);
        assert!(!result.is_pass());
    }

    #[test]
    fn test_error_records_text() {
        let result = CheckResult::error("pattern_match.code", Severity::Warning, "bad regex");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.details["error"], "bad regex");
        assert!(result.message.contains("bad regex"));
    }

    #[test]
    fn test_empty_collections_are_omitted() {
        let json = serde_json::to_value(CheckResult::pass("x", Severity::Info, "ok")).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("failing_rows").is_none());
        assert_eq!(json["status"], "pass");
        assert_eq!(json["severity"], "info");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::default(), Severity::Error);
    }
}
