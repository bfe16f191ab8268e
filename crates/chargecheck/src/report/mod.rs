//! Validation report model and summary aggregation.

mod check;

pub use check::{CheckResult, CheckStatus, RowSample, Severity};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::input::SourceMetadata;
use crate::layout::Layout;
use crate::profile::{FieldMapping, Profile};
use crate::structure::StructureReport;

/// Counts of check outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Summary {
    /// Roll up an ordered list of results in one pass.
    pub fn aggregate(checks: &[CheckResult]) -> Self {
        let mut summary = Summary::default();
        for check in checks {
            summary.record(check.status);
        }
        summary
    }

    fn record(&mut self, status: CheckStatus) {
        self.total_checks += 1;
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Error => self.errors += 1,
        }
    }

    /// No failed and no errored checks.
    pub fn is_ok(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Complete result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: DateTime<Utc>,
    pub rules_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub total_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<usize>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub preamble: IndexMap<String, String>,
    #[serde(default)]
    pub column_mapping: FieldMapping,
    /// Status of the profile's required-headers check alone.
    pub schema_ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureReport>,
    pub checks: Vec<CheckResult>,
    pub summary: Summary,
    /// Set only when the run could not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    /// Error-shaped report for a run that could not complete: zero checks
    /// and a single counted error.
    pub fn fatal(
        rules_version: impl Into<String>,
        source: Option<SourceMetadata>,
        error: impl std::fmt::Display,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            rules_version: rules_version.into(),
            source,
            total_rows: 0,
            profile: None,
            profile_description: None,
            layout: None,
            header_row: None,
            headers: Vec::new(),
            preamble: IndexMap::new(),
            column_mapping: FieldMapping::default(),
            schema_ok: false,
            structure: None,
            checks: Vec::new(),
            summary: Summary {
                errors: 1,
                ..Summary::default()
            },
            error: Some(error.to_string()),
        }
    }

    /// Whether the run completed with no failed or errored checks.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.summary.is_ok()
    }

    pub fn is_fatal(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
