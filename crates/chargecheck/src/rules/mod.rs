//! Declarative rules: the registry that loads them and the evaluator that
//! runs them against a loaded table.

mod document;
mod evaluator;
mod registry;

pub use document::RulesDocument;
pub use evaluator::{evaluate, evaluate_all, EvaluationContext};
pub use registry::RuleRegistry;

use serde::{Deserialize, Serialize};

use crate::profile::Profile;
use crate::report::Severity;
use crate::schema::ColumnType;

/// A compiled rule. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Stable identifier, e.g. `value_ranges.gross_price`.
    pub id: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    pub severity: Severity,
    /// Message used when the rule passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Closed set of rule kinds, dispatched by a single evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Header names compared after normalization.
    RequiredHeaders { profile: Profile, headers: Vec<String> },
    /// Columns present either through the canonical mapping or by name.
    RequiredColumns { profile: Profile, columns: Vec<String> },
    ColumnType { column: String, expected: ColumnType },
    ValueRange {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    NonNegative { column: String },
    DuplicateKey { columns: Vec<String> },
    DateFreshness { column: String, max_days: i64 },
    CashLeqGross { cash_column: String, gross_column: String },
    EnumMembership {
        column: String,
        allowed: Vec<String>,
        case_sensitive: bool,
    },
    PatternMatch { column: String, pattern: String },
    NotNull { column: String },
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::RequiredHeaders { .. } => "required_headers",
            RuleKind::RequiredColumns { .. } => "required_columns",
            RuleKind::ColumnType { .. } => "column_type",
            RuleKind::ValueRange { .. } => "value_range",
            RuleKind::NonNegative { .. } => "non_negative",
            RuleKind::DuplicateKey { .. } => "duplicate_key",
            RuleKind::DateFreshness { .. } => "date_freshness",
            RuleKind::CashLeqGross { .. } => "cash_leq_gross",
            RuleKind::EnumMembership { .. } => "enum_membership",
            RuleKind::PatternMatch { .. } => "pattern_match",
            RuleKind::NotNull { .. } => "not_null",
        }
    }

    /// Whether this is a profile header check feeding `schema_ok`.
    pub fn is_header_check(&self) -> bool {
        matches!(
            self,
            RuleKind::RequiredHeaders { .. } | RuleKind::RequiredColumns { .. }
        )
    }

    /// Column names the rule reads, before mapping resolution.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            RuleKind::RequiredHeaders { .. } | RuleKind::RequiredColumns { .. } => Vec::new(),
            RuleKind::DuplicateKey { columns } => columns.iter().map(String::as_str).collect(),
            RuleKind::CashLeqGross {
                cash_column,
                gross_column,
            } => vec![cash_column.as_str(), gross_column.as_str()],
            RuleKind::ColumnType { column, .. }
            | RuleKind::ValueRange { column, .. }
            | RuleKind::NonNegative { column }
            | RuleKind::DateFreshness { column, .. }
            | RuleKind::EnumMembership { column, .. }
            | RuleKind::PatternMatch { column, .. }
            | RuleKind::NotNull { column } => vec![column.as_str()],
        }
    }
}
