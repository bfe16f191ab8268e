//! Layout-specific structure checks for standard-charges files.
//!
//! These run beside the rule registry and are reported under
//! `structure`; they never count toward the check summary.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::DataTable;
use crate::layout::{Layout, LayoutConfig};
use crate::profile::normalize_header;
use crate::report::Severity;
use crate::sniff::strings;

/// Configuration for structure checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Labels every standard preamble should carry.
    pub preamble_labels: Vec<String>,
    pub tall_required_headers: Vec<String>,
    pub wide_base_headers: Vec<String>,
    /// Accepted names for the estimated allowed amount column.
    pub estimated_amount_columns: Vec<String>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            preamble_labels: strings(&[
                "hospital_name",
                "last_updated_on",
                "version",
                "hospital_location",
                "hospital_address",
                "license_number",
            ]),
            tall_required_headers: strings(&[
                "billing_code_type",
                "billing_code",
                "description",
                "standard_charge",
            ]),
            wide_base_headers: strings(&["billing_code_type", "billing_code", "description"]),
            estimated_amount_columns: strings(&["estimated_amount", "estimated_allowed_amount"]),
        }
    }
}

/// One structural problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureFinding {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl StructureFinding {
    fn new(rule: &str, severity: Severity, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message,
            details: Map::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of the structure checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    /// False when any error-severity finding exists.
    pub ok: bool,
    pub findings: Vec<StructureFinding>,
}

impl StructureReport {
    fn from_findings(findings: Vec<StructureFinding>) -> Self {
        let ok = !findings.iter().any(|f| f.severity == Severity::Error);
        Self { ok, findings }
    }

    pub fn errors(&self) -> impl Iterator<Item = &StructureFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }
}

/// Inputs to the structure checks.
pub struct StructureInput<'a> {
    pub layout: Layout,
    pub preamble: &'a IndexMap<String, String>,
    pub table: &'a DataTable,
    pub max_samples: usize,
}

/// Run every structure check for the detected layout.
pub fn check_structure(
    input: &StructureInput<'_>,
    config: &StructureConfig,
    layout_config: &LayoutConfig,
) -> StructureReport {
    let headers: Vec<String> = input.table.headers.iter().map(|h| normalize_header(h)).collect();
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let missing_from = |wanted: &[String]| -> Vec<String> {
        wanted
            .iter()
            .map(|h| normalize_header(h))
            .filter(|h| !present.contains(h.as_str()))
            .collect()
    };

    let mut findings = Vec::new();

    let missing_labels: Vec<&String> = config
        .preamble_labels
        .iter()
        .filter(|label| !input.preamble.contains_key(&label.to_lowercase()))
        .collect();
    if !missing_labels.is_empty() {
        findings.push(
            StructureFinding::new(
                "preamble_labels",
                Severity::Warning,
                format!(
                    "Missing preamble labels: {}",
                    missing_labels
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
            .with_detail("missing_labels", missing_labels.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
        );
    }

    match input.layout {
        Layout::Tall => {
            let missing = missing_from(&config.tall_required_headers);
            if !missing.is_empty() {
                findings.push(
                    StructureFinding::new(
                        "required_headers_tall",
                        Severity::Error,
                        format!("Missing tall headers: {}", missing.join(", ")),
                    )
                    .with_detail("missing_headers", missing),
                );
            }
            findings.extend(drug_unit_pairs(input));
        }
        Layout::Wide => {
            let missing = missing_from(&config.wide_base_headers);
            let separator = layout_config.payer_plan_separator.as_str();
            let has_payer_plan =
                !separator.is_empty() && input.table.headers.iter().any(|h| h.contains(separator));
            if !missing.is_empty() || !has_payer_plan {
                findings.push(
                    StructureFinding::new(
                        "required_headers_wide",
                        Severity::Error,
                        format!(
                            "Missing wide base columns [{}] or no payer{separator}plan columns detected",
                            missing.join(", ")
                        ),
                    )
                    .with_detail("missing_headers", missing)
                    .with_detail("has_payer_plan_columns", has_payer_plan),
                );
            }
        }
    }

    let indicators: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|h| h.contains("percent") || h.contains("algorithm"))
        .collect();
    if !indicators.is_empty() {
        let has_estimate = config
            .estimated_amount_columns
            .iter()
            .any(|c| present.contains(normalize_header(c).as_str()));
        if !has_estimate {
            findings.push(
                StructureFinding::new(
                    "estimated_allowed_amount",
                    Severity::Warning,
                    "Algorithm/percentage charges detected in header names, but no estimated allowed amount column found".to_string(),
                )
                .with_detail("indicator_columns", indicators),
            );
        }
    }

    StructureReport::from_findings(findings)
}

/// Drug unit and drug type of measurement must be given together.
fn drug_unit_pairs(input: &StructureInput<'_>) -> Option<StructureFinding> {
    let table = input.table;
    let find = |name: &str| {
        table
            .headers
            .iter()
            .position(|h| normalize_header(h) == name)
    };
    let unit = find("drug_unit_of_measurement")?;
    let kind = find("drug_type_of_measurement")?;

    let mut count = 0usize;
    let mut rows = Vec::new();
    for row in 0..table.row_count() {
        if table.is_null(row, unit) != table.is_null(row, kind) {
            count += 1;
            if rows.len() < input.max_samples {
                rows.push(row + 1);
            }
        }
    }

    (count > 0).then(|| {
        StructureFinding::new(
            "drug_unit_type_pair",
            Severity::Error,
            format!("{count} rows give only one of drug unit and drug type of measurement"),
        )
        .with_detail("invalid_count", count)
        .with_detail("sample_rows", rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            b',',
        )
    }

    fn full_preamble() -> IndexMap<String, String> {
        StructureConfig::default()
            .preamble_labels
            .into_iter()
            .map(|l| (l, "x".to_string()))
            .collect()
    }

    fn run(layout: Layout, preamble: &IndexMap<String, String>, t: &DataTable) -> StructureReport {
        let input = StructureInput {
            layout,
            preamble,
            table: t,
            max_samples: 5,
        };
        check_structure(&input, &StructureConfig::default(), &LayoutConfig::default())
    }

    fn rules(report: &StructureReport) -> Vec<&str> {
        report.findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[test]
    fn test_clean_tall_file() {
        let t = table(
            &["billing_code_type", "billing_code", "description", "standard_charge"],
            &[&["CPT", "1", "Visit", "100"]],
        );
        let report = run(Layout::Tall, &full_preamble(), &t);
        assert!(report.ok);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_missing_preamble_labels_is_warning() {
        let t = table(
            &["billing_code_type", "billing_code", "description", "standard_charge"],
            &[],
        );
        let report = run(Layout::Tall, &IndexMap::new(), &t);
        assert!(report.ok);
        assert_eq!(rules(&report), vec!["preamble_labels"]);
    }

    #[test]
    fn test_tall_missing_headers() {
        let t = table(&["billing_code", "description"], &[]);
        let report = run(Layout::Tall, &full_preamble(), &t);

        assert!(!report.ok);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(
            report.findings[0].details["missing_headers"],
            serde_json::json!(["billing_code_type", "standard_charge"])
        );
    }

    #[test]
    fn test_wide_requires_payer_plan_columns() {
        let t = table(&["billing_code_type", "billing_code", "description"], &[]);
        let report = run(Layout::Wide, &full_preamble(), &t);
        assert_eq!(rules(&report), vec!["required_headers_wide"]);

        let t = table(
            &["billing_code_type", "billing_code", "description", "standard_charge|Aetna|PPO"],
            &[],
        );
        assert!(run(Layout::Wide, &full_preamble(), &t).ok);
    }

    #[test]
    fn test_percentage_without_estimate() {
        let t = table(
            &[
                "billing_code_type",
                "billing_code",
                "description",
                "standard_charge",
                "standard_charge_percentage",
            ],
            &[],
        );
        let report = run(Layout::Tall, &full_preamble(), &t);
        assert!(report.ok);
        assert_eq!(rules(&report), vec!["estimated_allowed_amount"]);
    }

    #[test]
    fn test_drug_unit_type_pairs() {
        let t = table(
            &[
                "billing_code_type",
                "billing_code",
                "description",
                "standard_charge",
                "drug_unit_of_measurement",
                "drug_type_of_measurement",
            ],
            &[
                &["NDC", "1", "a", "1", "5", "ML"],
                &["NDC", "2", "b", "1", "5", ""],
                &["NDC", "3", "c", "1", "", ""],
                &["NDC", "4", "d", "1", "", "UN"],
            ],
        );
        let report = run(Layout::Tall, &full_preamble(), &t);

        assert!(!report.ok);
        let finding = &report.findings[0];
        assert_eq!(finding.rule, "drug_unit_type_pair");
        assert_eq!(finding.details["invalid_count"], 2);
        assert_eq!(finding.details["sample_rows"], serde_json::json!([2, 4]));
    }
}
