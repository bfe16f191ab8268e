//! Serde model of the rule configuration document.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::report::Severity;
use crate::schema::ColumnType;

/// The external rule document, as written in YAML or JSON.
///
/// Unknown top-level keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesDocument {
    #[serde(deserialize_with = "scalar_text")]
    pub version: String,
    /// Header requirements keyed by profile name.
    pub profiles: IndexMap<String, ProfileSpec>,
    pub column_types: IndexMap<String, ColumnType>,
    pub value_ranges: IndexMap<String, RangeSpec>,
    pub non_negative: Vec<String>,
    pub duplicates_by: Vec<DuplicateSpec>,
    pub date_within_days: Option<FreshnessSpec>,
    pub cash_leq_gross: Option<CashGrossSpec>,
    pub enum_values: IndexMap<String, EnumSpec>,
    pub pattern_match: IndexMap<String, PatternSpec>,
    pub not_null: Vec<String>,
    pub error_reporting: ErrorReporting,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSpec {
    pub required_headers: Vec<String>,
    pub required_columns: Vec<String>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateSpec {
    pub columns: Vec<String>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessSpec {
    pub column: String,
    pub max_days: i64,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CashGrossSpec {
    pub enabled: bool,
    pub cash_column: String,
    pub gross_column: String,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

impl Default for CashGrossSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            cash_column: "cash_price".to_string(),
            gross_column: "gross_price".to_string(),
            severity: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumSpec {
    #[serde(deserialize_with = "scalar_list")]
    pub allowed: Vec<String>,
    pub case_sensitive: bool,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

impl Default for EnumSpec {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            case_sensitive: true,
            severity: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorReporting {
    pub max_failing_rows_per_rule: usize,
}

impl Default for ErrorReporting {
    fn default() -> Self {
        Self {
            max_failing_rows_per_rule: 5,
        }
    }
}

/// A YAML/JSON scalar read as text, so `version: 2` and `version: "2.0"`
/// both work.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(String::from).unwrap_or_default())
}

fn scalar_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values: Vec<Scalar> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(String::from).collect())
}
