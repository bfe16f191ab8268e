//! Rule registry: loads a rule document and compiles it into an ordered,
//! immutable list of [`RuleDefinition`]s.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::document::RulesDocument;
use super::{RuleDefinition, RuleKind};
use crate::error::{ChargecheckError, Result};
use crate::profile::Profile;
use crate::report::Severity;

const BUILTIN_RULES: &str = include_str!("../../rules/registry.yaml");

/// Compiled rules, shared read-only across runs.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    version: String,
    max_failing_rows: usize,
    header_rules: IndexMap<Profile, Vec<RuleDefinition>>,
    rules: Vec<RuleDefinition>,
}

impl RuleRegistry {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ChargecheckError::io(path, e))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let registry = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => {
                return Err(ChargecheckError::Config(format!(
                    "unsupported rule document extension '{other}' for {}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), rules = registry.len(), "loaded rule registry");
        Ok(registry)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: RulesDocument = serde_yaml_ng::from_str(text)?;
        Self::from_document(document)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: RulesDocument = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    /// The registry bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_RULES)
    }

    /// Compile a parsed document.
    pub fn from_document(document: RulesDocument) -> Result<Self> {
        let header_rules = compile_profiles(&document)?;
        let rules = compile_rules(&document)?;
        let version = if document.version.trim().is_empty() {
            "unknown".to_string()
        } else {
            document.version
        };

        Ok(Self {
            version,
            max_failing_rows: document.error_reporting.max_failing_rows_per_rule,
            header_rules,
            rules,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cap on failing-row samples per rule.
    pub fn max_failing_rows(&self) -> usize {
        self.max_failing_rows
    }

    /// Profile-independent rules in evaluation order.
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    /// Header checks configured for a profile.
    pub fn header_rules(&self, profile: Profile) -> &[RuleDefinition] {
        self.header_rules
            .get(&profile)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Everything that runs for a file of this profile: header checks
    /// first, then the general rules.
    pub fn rules_for(&self, profile: Profile) -> Vec<&RuleDefinition> {
        self.header_rules(profile)
            .iter()
            .chain(self.rules.iter())
            .collect()
    }

    /// Header checks for every profile, then the general rules.
    pub fn all_rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.header_rules.values().flatten().chain(self.rules.iter())
    }

    /// Number of compiled rules across all profiles.
    pub fn len(&self) -> usize {
        self.rules.len() + self.header_rules.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn definition(
    id: String,
    kind: RuleKind,
    severity: Option<Severity>,
    description: Option<String>,
) -> RuleDefinition {
    RuleDefinition {
        id,
        kind,
        severity: severity.unwrap_or_default(),
        description,
    }
}

fn compile_profiles(document: &RulesDocument) -> Result<IndexMap<Profile, Vec<RuleDefinition>>> {
    let mut compiled: IndexMap<Profile, Vec<RuleDefinition>> = IndexMap::new();

    for (name, spec) in &document.profiles {
        let profile = match name.parse::<Profile>() {
            Ok(profile) => profile,
            Err(_) => {
                warn!(profile = %name, "ignoring rules for unknown profile");
                continue;
            }
        };

        let rules = compiled.entry(profile).or_default();
        rules.clear();
        if !spec.required_headers.is_empty() {
            rules.push(definition(
                "required_headers".to_string(),
                RuleKind::RequiredHeaders {
                    profile,
                    headers: spec.required_headers.clone(),
                },
                spec.severity,
                spec.description.clone(),
            ));
        }
        if !spec.required_columns.is_empty() {
            rules.push(definition(
                "required_columns".to_string(),
                RuleKind::RequiredColumns {
                    profile,
                    columns: spec.required_columns.clone(),
                },
                spec.severity,
                spec.description.clone(),
            ));
        }
    }

    Ok(compiled)
}

fn compile_rules(document: &RulesDocument) -> Result<Vec<RuleDefinition>> {
    let mut rules = Vec::new();

    for (column, expected) in &document.column_types {
        rules.push(definition(
            format!("column_types.{column}"),
            RuleKind::ColumnType {
                column: column.clone(),
                expected: *expected,
            },
            None,
            None,
        ));
    }

    for (column, spec) in &document.value_ranges {
        if let (Some(min), Some(max)) = (spec.min, spec.max) {
            if min > max {
                return Err(ChargecheckError::Config(format!(
                    "value_ranges.{column}: min {min} is greater than max {max}"
                )));
            }
        }
        rules.push(definition(
            format!("value_ranges.{column}"),
            RuleKind::ValueRange {
                column: column.clone(),
                min: spec.min,
                max: spec.max,
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    for column in &document.non_negative {
        rules.push(definition(
            format!("non_negative.{column}"),
            RuleKind::NonNegative {
                column: column.clone(),
            },
            None,
            None,
        ));
    }

    for spec in &document.duplicates_by {
        if spec.columns.is_empty() {
            return Err(ChargecheckError::Config(
                "duplicates_by entry has no columns".to_string(),
            ));
        }
        rules.push(definition(
            format!("duplicates_by.{}", spec.columns.join("+")),
            RuleKind::DuplicateKey {
                columns: spec.columns.clone(),
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    if let Some(spec) = &document.date_within_days {
        if spec.max_days < 0 {
            return Err(ChargecheckError::Config(format!(
                "date_within_days.max_days must not be negative, got {}",
                spec.max_days
            )));
        }
        rules.push(definition(
            "date_within_days".to_string(),
            RuleKind::DateFreshness {
                column: spec.column.clone(),
                max_days: spec.max_days,
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    if let Some(spec) = document.cash_leq_gross.as_ref().filter(|s| s.enabled) {
        rules.push(definition(
            "cash_leq_gross".to_string(),
            RuleKind::CashLeqGross {
                cash_column: spec.cash_column.clone(),
                gross_column: spec.gross_column.clone(),
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    for (column, spec) in &document.enum_values {
        rules.push(definition(
            format!("enum_values.{column}"),
            RuleKind::EnumMembership {
                column: column.clone(),
                allowed: spec.allowed.clone(),
                case_sensitive: spec.case_sensitive,
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    for (column, spec) in &document.pattern_match {
        rules.push(definition(
            format!("pattern_match.{column}"),
            RuleKind::PatternMatch {
                column: column.clone(),
                pattern: spec.pattern.clone(),
            },
            spec.severity,
            spec.description.clone(),
        ));
    }

    for column in &document.not_null {
        rules.push(definition(
            format!("not_null.{column}"),
            RuleKind::NotNull {
                column: column.clone(),
            },
            None,
            None,
        ));
    }

    Ok(rules)
}
