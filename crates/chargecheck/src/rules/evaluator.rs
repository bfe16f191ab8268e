//! Executes compiled rules against a loaded table.
//!
//! Every rule kind runs through [`evaluate`]. A rule whose columns are
//! absent (after canonical mapping) yields no result at all; a rule that
//! raises yields an `error` result and evaluation moves on.

use std::collections::HashSet;

use chrono::{NaiveDateTime, TimeDelta};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{RuleDefinition, RuleKind};
use crate::error::{ChargecheckError, Result};
use crate::input::DataTable;
use crate::profile::{normalize_header, FieldMapping, Profile};
use crate::report::{CheckResult, RowSample, Severity};
use crate::schema::{infer_column_type, parse_timestamp, ColumnType};

/// Everything a rule needs besides its own definition.
pub struct EvaluationContext<'a> {
    pub table: &'a DataTable,
    pub mapping: &'a FieldMapping,
    pub profile: Profile,
    pub max_failing_rows: usize,
    /// Reference instant for freshness checks.
    pub now: NaiveDateTime,
}

impl<'a> EvaluationContext<'a> {
    /// Resolve a rule's column reference: canonical name first, then the
    /// literal column name.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.mapping
            .get_by_name(name)
            .and_then(|actual| self.table.column_index(actual))
            .or_else(|| self.table.column_index(name))
    }

    fn column_name(&self, index: usize) -> &str {
        self.table.headers.get(index).map(String::as_str).unwrap_or("")
    }

    /// Count rows matching `predicate` and sample the first few.
    fn scan(&self, mut predicate: impl FnMut(usize) -> bool) -> (usize, Vec<RowSample>) {
        let mut count = 0;
        let mut sample = Vec::new();
        for row in 0..self.table.row_count() {
            if predicate(row) {
                count += 1;
                if sample.len() < self.max_failing_rows {
                    sample.push(self.table.row_as_map(row));
                }
            }
        }
        (count, sample)
    }

    /// Non-null cell text, trimmed.
    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.table
            .get(row, col)
            .filter(|v| !DataTable::is_null_value(v))
            .map(str::trim)
    }

    fn number(&self, row: usize, col: usize) -> Option<f64> {
        self.table.get(row, col).and_then(DataTable::numeric_value)
    }
}

/// Evaluate one rule. `None` means the rule was skipped.
pub fn evaluate(rule: &RuleDefinition, ctx: &EvaluationContext<'_>) -> Option<CheckResult> {
    match run(rule, ctx) {
        Ok(Some(result)) => Some(result),
        Ok(None) => {
            debug!(rule = %rule.id, "rule skipped, column not present");
            None
        }
        Err(e) => {
            warn!(rule = %rule.id, error = %e, "rule evaluation failed");
            Some(CheckResult::error(&rule.id, rule.severity, e))
        }
    }
}

/// Evaluate rules in order, dropping skipped ones.
pub fn evaluate_all<'r>(
    rules: impl IntoIterator<Item = &'r RuleDefinition>,
    ctx: &EvaluationContext<'_>,
) -> Vec<CheckResult> {
    rules.into_iter().filter_map(|rule| evaluate(rule, ctx)).collect()
}

fn run(rule: &RuleDefinition, ctx: &EvaluationContext<'_>) -> Result<Option<CheckResult>> {
    let check = Check { rule, ctx };
    match &rule.kind {
        RuleKind::RequiredHeaders { profile, headers } => {
            Ok(Some(check.required_headers(*profile, headers)))
        }
        RuleKind::RequiredColumns { profile, columns } => {
            Ok(Some(check.required_columns(*profile, columns)))
        }
        RuleKind::ColumnType { column, expected } => Ok(ctx
            .resolve(column)
            .map(|col| check.column_type(column, col, *expected))),
        RuleKind::ValueRange { column, min, max } => Ok(ctx
            .resolve(column)
            .map(|col| check.value_range(column, col, *min, *max))),
        RuleKind::NonNegative { column } => {
            Ok(ctx.resolve(column).map(|col| check.non_negative(column, col)))
        }
        RuleKind::DuplicateKey { columns } => {
            let resolved: Option<Vec<usize>> = columns.iter().map(|c| ctx.resolve(c)).collect();
            Ok(resolved.map(|cols| check.duplicates(columns, &cols)))
        }
        RuleKind::DateFreshness { column, max_days } => match ctx.resolve(column) {
            Some(col) => check.date_freshness(column, col, *max_days).map(Some),
            None => Ok(None),
        },
        RuleKind::CashLeqGross {
            cash_column,
            gross_column,
        } => Ok(ctx
            .resolve(cash_column)
            .zip(ctx.resolve(gross_column))
            .map(|(cash, gross)| check.cash_leq_gross(cash, gross))),
        RuleKind::EnumMembership {
            column,
            allowed,
            case_sensitive,
        } => Ok(ctx
            .resolve(column)
            .map(|col| check.enum_membership(column, col, allowed, *case_sensitive))),
        RuleKind::PatternMatch { column, pattern } => match ctx.resolve(column) {
            Some(col) => check.pattern_match(column, col, pattern).map(Some),
            None => Ok(None),
        },
        RuleKind::NotNull { column } => {
            Ok(ctx.resolve(column).map(|col| check.not_null(column, col)))
        }
    }
}

/// One rule bound to its context.
struct Check<'r, 'c, 'a> {
    rule: &'r RuleDefinition,
    ctx: &'c EvaluationContext<'a>,
}

impl Check<'_, '_, '_> {
    fn severity(&self) -> Severity {
        self.rule.severity
    }

    fn pass(&self, default_message: String) -> CheckResult {
        let message = self.rule.description.clone().unwrap_or(default_message);
        CheckResult::pass(&self.rule.id, self.severity(), message)
    }

    fn fail(&self, message: String) -> CheckResult {
        CheckResult::fail(&self.rule.id, self.severity(), message)
    }

    fn required_headers(&self, profile: Profile, required: &[String]) -> CheckResult {
        let present: IndexSet<String> = self
            .ctx
            .table
            .headers
            .iter()
            .map(|h| normalize_header(h))
            .collect();

        let mut seen = HashSet::new();
        let missing: Vec<String> = required
            .iter()
            .map(|h| normalize_header(h))
            .filter(|h| seen.insert(h.clone()) && !present.contains(h))
            .collect();

        if missing.is_empty() {
            self.pass("All required headers present".to_string())
                .with_detail("profile", profile.as_str())
                .with_detail("required_headers", required.to_vec())
        } else {
            self.fail(format!("Missing required headers: {}", missing.join(", ")))
                .with_detail("profile", profile.as_str())
                .with_detail("profile_description", profile.description())
                .with_detail("missing_headers", missing)
                .with_detail(
                    "present_headers",
                    present.iter().take(200).cloned().collect::<Vec<_>>(),
                )
        }
    }

    fn required_columns(&self, profile: Profile, required: &[String]) -> CheckResult {
        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|c| self.ctx.resolve(c).is_none())
            .collect();

        if missing.is_empty() {
            self.pass("All required columns present".to_string())
                .with_detail("profile", profile.as_str())
                .with_detail("required_columns", required.to_vec())
        } else {
            self.fail(format!("Missing required columns: {}", missing.join(", ")))
                .with_detail("profile", profile.as_str())
                .with_detail("profile_description", profile.description())
                .with_detail("missing_columns", missing)
                .with_detail(
                    "present_columns",
                    self.ctx.table.headers.iter().take(200).cloned().collect::<Vec<_>>(),
                )
        }
    }

    fn column_type(&self, column: &str, col: usize, expected: ColumnType) -> CheckResult {
        let actual = infer_column_type(
            self.ctx
                .table
                .column_values(col)
                .filter(|v| !DataTable::is_null_value(v)),
        );

        if actual.satisfies(expected) {
            self.pass(format!("Column '{column}' has correct type"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("type", expected.as_str())
        } else {
            self.fail(format!("Column '{column}' has type {actual}, expected {expected}"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("expected_type", expected.as_str())
                .with_detail("actual_type", actual.as_str())
        }
    }

    fn value_range(&self, column: &str, col: usize, min: Option<f64>, max: Option<f64>) -> CheckResult {
        let (count, sample) = self.ctx.scan(|row| {
            self.ctx.number(row, col).is_some_and(|v| {
                min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m)
            })
        });

        let bound = |b: Option<f64>| b.map_or(Value::Null, |v| json!(v));
        let range = format!(
            "[{}, {}]",
            min.map_or("-inf".to_string(), |v| v.to_string()),
            max.map_or("inf".to_string(), |v| v.to_string())
        );

        if count == 0 {
            self.pass(format!("All {column} values within {range}"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("min", bound(min))
                .with_detail("max", bound(max))
        } else {
            self.fail(format!("{count} rows have {column} outside range {range}"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("min", bound(min))
                .with_detail("max", bound(max))
                .with_detail("out_of_range_count", count)
                .with_failing_rows(sample)
        }
    }

    fn non_negative(&self, column: &str, col: usize) -> CheckResult {
        let (count, sample) = self
            .ctx
            .scan(|row| self.ctx.number(row, col).is_some_and(|v| v < 0.0));

        if count == 0 {
            self.pass(format!("All {column} values are non-negative"))
                .with_detail("column", self.ctx.column_name(col))
        } else {
            self.fail(format!("{count} rows have negative {column}"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("negative_count", count)
                .with_failing_rows(sample)
        }
    }

    fn duplicates(&self, columns: &[String], cols: &[usize]) -> CheckResult {
        let table = self.ctx.table;
        let mut groups: IndexMap<Vec<Option<&str>>, usize> = IndexMap::new();
        for row in 0..table.row_count() {
            let key = cols.iter().map(|&c| self.ctx.cell(row, c)).collect();
            *groups.entry(key).or_insert(0) += 1;
        }

        let duplicated: Vec<(&Vec<Option<&str>>, &usize)> =
            groups.iter().filter(|(_, n)| **n > 1).collect();
        let actual: Vec<&str> = cols.iter().map(|&c| self.ctx.column_name(c)).collect();

        if duplicated.is_empty() {
            return self
                .pass(format!("No duplicates by {}", columns.join(", ")))
                .with_detail("columns", actual);
        }

        let duplicate_rows: usize = duplicated.iter().map(|(_, n)| **n).sum();
        let sample = duplicated
            .iter()
            .take(self.ctx.max_failing_rows)
            .map(|(key, n)| {
                let mut entry: RowSample = actual
                    .iter()
                    .zip(key.iter())
                    .map(|(name, value)| {
                        (name.to_string(), value.map_or(Value::Null, |v| json!(v)))
                    })
                    .collect();
                entry.insert("count".to_string(), json!(n));
                entry
            })
            .collect();

        self.fail(format!("{} duplicate combinations found", duplicated.len()))
            .with_detail("columns", actual)
            .with_detail("duplicate_combinations", duplicated.len())
            .with_detail("duplicate_rows", duplicate_rows)
            .with_failing_rows(sample)
    }

    fn date_freshness(&self, column: &str, col: usize, max_days: i64) -> Result<CheckResult> {
        let cutoff = TimeDelta::try_days(max_days)
            .and_then(|delta| self.ctx.now.checked_sub_signed(delta))
            .ok_or_else(|| {
                ChargecheckError::Config(format!("max_days {max_days} is out of range"))
            })?;

        let mut unparsed = 0usize;
        let (count, sample) = self.ctx.scan(|row| match self.ctx.cell(row, col) {
            Some(text) => match parse_timestamp(text) {
                Some(ts) => ts < cutoff,
                None => {
                    unparsed += 1;
                    false
                }
            },
            None => false,
        });

        let cutoff_text = cutoff.format("%Y-%m-%dT%H:%M:%S").to_string();
        let result = if count == 0 {
            self.pass(format!("All {column} dates within {max_days} days"))
        } else {
            self.fail(format!("{count} rows have dates older than {max_days} days"))
                .with_detail("old_dates_count", count)
                .with_failing_rows(sample)
        };

        Ok(result
            .with_detail("column", self.ctx.column_name(col))
            .with_detail("max_days", max_days)
            .with_detail("cutoff_date", cutoff_text)
            .with_detail("unparsed_count", unparsed))
    }

    fn cash_leq_gross(&self, cash: usize, gross: usize) -> CheckResult {
        let (count, sample) = self.ctx.scan(|row| {
            match (self.ctx.number(row, cash), self.ctx.number(row, gross)) {
                (Some(c), Some(g)) => c > g,
                _ => false,
            }
        });

        let cash_name = self.ctx.column_name(cash);
        let gross_name = self.ctx.column_name(gross);

        if count == 0 {
            self.pass(format!("{cash_name} is never greater than {gross_name}"))
                .with_detail("cash_column", cash_name)
                .with_detail("gross_column", gross_name)
        } else {
            self.fail(format!("{count} rows have {cash_name} > {gross_name}"))
                .with_detail("cash_column", cash_name)
                .with_detail("gross_column", gross_name)
                .with_detail("invalid_count", count)
                .with_failing_rows(sample)
        }
    }

    fn enum_membership(
        &self,
        column: &str,
        col: usize,
        allowed: &[String],
        case_sensitive: bool,
    ) -> CheckResult {
        let fold = |s: &str| {
            if case_sensitive {
                s.to_string()
            } else {
                s.to_uppercase()
            }
        };
        let allowed_set: HashSet<String> = allowed.iter().map(|a| fold(a.trim())).collect();

        let (count, sample) = self.ctx.scan(|row| {
            self.ctx
                .cell(row, col)
                .is_some_and(|v| !allowed_set.contains(&fold(v)))
        });

        if count == 0 {
            self.pass(format!("All {column} values are allowed"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("allowed_values", allowed.to_vec())
        } else {
            self.fail(format!("{count} rows have invalid {column} values"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("allowed_values", allowed.to_vec())
                .with_detail("case_sensitive", case_sensitive)
                .with_detail("invalid_count", count)
                .with_failing_rows(sample)
        }
    }

    fn pattern_match(&self, column: &str, col: usize, pattern: &str) -> Result<CheckResult> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;

        let (count, sample) = self.ctx.scan(|row| {
            self.ctx
                .cell(row, col)
                .is_some_and(|v| !regex.is_match(v))
        });

        let result = if count == 0 {
            self.pass(format!("All {column} values match pattern"))
        } else {
            self.fail(format!("{count} rows have {column} not matching pattern"))
                .with_detail("invalid_count", count)
                .with_failing_rows(sample)
        };
        Ok(result
            .with_detail("column", self.ctx.column_name(col))
            .with_detail("pattern", pattern))
    }

    fn not_null(&self, column: &str, col: usize) -> CheckResult {
        let (count, sample) = self.ctx.scan(|row| self.ctx.table.is_null(row, col));

        if count == 0 {
            self.pass(format!("No null values in {column}"))
                .with_detail("column", self.ctx.column_name(col))
        } else {
            self.fail(format!("{count} rows have null {column}"))
                .with_detail("column", self.ctx.column_name(col))
                .with_detail("null_count", count)
                .with_failing_rows(sample)
        }
    }
}
