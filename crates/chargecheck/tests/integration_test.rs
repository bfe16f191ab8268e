//! Integration tests for chargecheck.

use std::io::Write;
use tempfile::NamedTempFile;

use chrono::{TimeZone, Utc};
use chargecheck::{
    validate_file, CheckStatus, Engine, EngineConfig, Layout, Profile, RuleRegistry,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn engine_with_rules(yaml: &str) -> Engine {
    let registry = RuleRegistry::from_yaml_str(yaml).expect("Rules should parse");
    Engine::new(EngineConfig::default(), registry)
}

fn builtin_engine() -> Engine {
    Engine::with_builtin_rules(EngineConfig::default()).expect("Builtin rules should load")
}

const STANDARD_TALL: &str = "hospital_name,last_updated_on,version,hospital_location,hospital_address,license_number\n\
Acme General,2024-01-01,2.0.0,Springfield,1 Main St,12345\n\
billing_code,billing_code_type,description,standard_charge,payer_name,plan_name\n\
99213,CPT,Office visit,128.00,Aetna,Silver\n\
99214,CPT,Office visit extended,190.00,Aetna,Silver\n\
J1100,HCPCS,Dexamethasone,12.50,Cigna,Gold\n";

// =============================================================================
// Structure Sniffing
// =============================================================================

#[test]
fn test_preamble_puts_header_at_row_two() {
    let file = create_test_file(STANDARD_TALL);
    let report = builtin_engine().validate_path(file.path());

    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);
    assert_eq!(report.header_row, Some(2));
    assert_eq!(report.total_rows, 3);
    assert_eq!(
        report.preamble.get("hospital_name").map(String::as_str),
        Some("Acme General")
    );
    assert_eq!(report.headers[0], "billing_code");
}

#[test]
fn test_blank_line_inside_preamble_keeps_preamble() {
    let content = "hospital_name,last_updated_on,version,hospital_location,hospital_address,license_number\n\
                   \n\
                   Acme General,2024-01-01,2.0.0,Springfield,1 Main St,12345\n\
                   billing_code,billing_code_type,description,standard_charge\n\
                   1,CPT,Visit,100\n";
    let file = create_test_file(content);
    let report = builtin_engine().validate_path(file.path());

    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);
    assert_eq!(report.header_row, Some(3));
    assert_eq!(report.total_rows, 1);
    assert_eq!(report.preamble.len(), 6);
    assert_eq!(report.headers[0], "billing_code");

    let structure = report.structure.expect("Standard files get structure checks");
    assert!(
        !structure.findings.iter().any(|f| f.rule == "preamble_labels"),
        "preamble labels reported missing: {:?}",
        structure.findings
    );
}

#[test]
fn test_no_preamble_header_at_row_zero() {
    let content = "code,code_system,gross_price,cash_price\n\
                   A1,CPT,100,80\n\
                   A2,CPT,200,150\n";
    let file = create_test_file(content);
    let report = builtin_engine().validate_path(file.path());

    assert_eq!(report.header_row, Some(0));
    assert!(report.preamble.is_empty());
    assert_eq!(report.profile, Some(Profile::Simple));
    assert_eq!(report.total_rows, 2);
}

#[test]
fn test_generic_metadata_scenario() {
    let content = "Hospital Name,Updated\nAcme,2024-01-01\nbilling_code,billing_code_type,description,standard_charge\n1,CPT,Visit,100\n";
    let report = builtin_engine().validate_bytes("scenario.csv", content.as_bytes());

    assert_eq!(report.header_row, Some(2));
    assert_eq!(report.layout, Some(Layout::Tall));
    assert_eq!(report.profile, Some(Profile::Standard));
    assert!(report.schema_ok);

    let header_check = report
        .checks
        .iter()
        .find(|c| c.rule == "required_headers")
        .expect("Header check should run");
    assert_eq!(header_check.status, CheckStatus::Pass);
}

#[test]
fn test_header_found_when_prefix_is_truncated() {
    let mut content = String::from(
        "hospital_name,last_updated_on,version\nAcme General,2024-01-01,2.0.0\nbilling_code,billing_code_type,description,standard_charge\n",
    );
    for i in 0..50 {
        content.push_str(&format!("{i},CPT,Item {i},{}.00\n", i + 1));
    }
    let config = EngineConfig {
        prefix_bytes: 140,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, RuleRegistry::builtin().unwrap());
    let report = engine.validate_bytes("long.csv", content.as_bytes());

    assert_eq!(report.header_row, Some(2));
    assert_eq!(report.total_rows, 50);
}

#[test]
fn test_tab_delimited_detected() {
    let content = "code\tcode_system\tgross_price\nA1\tCPT\t10\nA2\tCPT\t20\n";
    let file = create_test_file(content);
    let report = builtin_engine().validate_path(file.path());

    let source = report.source.expect("Source metadata");
    assert_eq!(source.format, "tsv");
    assert_eq!(report.headers, vec!["code", "code_system", "gross_price"]);
}

// =============================================================================
// Layout and Profile
// =============================================================================

#[test]
fn test_wide_file_classified_wide() {
    let content = "hospital_name,last_updated_on,version\n\
                   Acme,2024-01-01,2.0.0\n\
                   billing_code_type,billing_code,description,Aetna|Silver HMO,Cigna|Gold PPO\n\
                   CPT,99213,Office visit,120,130\n";
    let report = builtin_engine().validate_bytes("wide.csv", content.as_bytes());

    assert_eq!(report.layout, Some(Layout::Wide));
    assert_eq!(report.profile, Some(Profile::Standard));
    let structure = report.structure.expect("Standard files get structure checks");
    assert!(structure.ok);
    assert!(
        !structure
            .findings
            .iter()
            .any(|f| f.rule == "required_headers_wide")
    );
}

#[test]
fn test_wide_without_base_columns_is_structure_error() {
    let content = "billing_code,standard_charge,Aetna|Silver HMO\n99213,1,2\n";
    let report = builtin_engine().validate_bytes("wide.csv", content.as_bytes());

    assert_eq!(report.layout, Some(Layout::Wide));
    let structure = report.structure.expect("Structure report");
    assert!(!structure.ok);
    assert!(
        structure
            .findings
            .iter()
            .any(|f| f.rule == "required_headers_wide")
    );
}

#[test]
fn test_canonical_mapping_in_report() {
    let report = builtin_engine().validate_bytes("tall.csv", STANDARD_TALL.as_bytes());

    assert_eq!(
        report.column_mapping.get_by_name("gross_price"),
        Some("standard_charge")
    );
    assert_eq!(report.column_mapping.get_by_name("code"), Some("billing_code"));
    assert_eq!(
        report.profile_description.as_deref(),
        Some("Hospital Price Transparency standard charges CSV")
    );
}

// =============================================================================
// Rule Evaluation
// =============================================================================

#[test]
fn test_not_null_three_of_ten() {
    let mut content = String::from("code,gross_price\n");
    for i in 0..10 {
        let code = if i % 3 == 1 { String::new() } else { format!("C{i}") };
        content.push_str(&format!("{code},{}\n", i * 10));
    }
    let engine = engine_with_rules(
        "not_null: [code]\nerror_reporting:\n  max_failing_rows_per_rule: 2\n",
    );
    let report = engine.validate_bytes("nulls.csv", content.as_bytes());

    let check = report
        .checks
        .iter()
        .find(|c| c.rule == "not_null.code")
        .expect("not_null check should run");
    assert_eq!(check.status, CheckStatus::Fail);
    assert_eq!(check.details["null_count"], 3);
    assert!(check.failing_rows.len() <= 2);
    assert_eq!(report.summary.failed, 1);
}

#[test]
fn test_cash_leq_gross_single_violation() {
    let content = "code,cash_price,gross_price\nA,50,40\nB,10,20\n";
    let engine = engine_with_rules("cash_leq_gross:\n  enabled: true\n");
    let report = engine.validate_bytes("cash.csv", content.as_bytes());

    let check = report
        .checks
        .iter()
        .find(|c| c.rule == "cash_leq_gross")
        .expect("cash rule should run");
    assert_eq!(check.status, CheckStatus::Fail);
    assert_eq!(check.details["invalid_count"], 1);
    assert_eq!(check.failing_rows[0]["code"], "A");
}

#[test]
fn test_rule_on_absent_column_is_skipped() {
    let content = "code,gross_price\nA,1\n";
    let engine = engine_with_rules("not_null: [code, payer_name]\nnon_negative: [missing]\n");
    let report = engine.validate_bytes("skip.csv", content.as_bytes());

    let ids: Vec<&str> = report.checks.iter().map(|c| c.rule.as_str()).collect();
    assert_eq!(ids, vec!["not_null.code"]);
    assert_eq!(report.summary.total_checks, 1);
    assert_eq!(report.summary.errors, 0);
}

#[test]
fn test_rule_error_does_not_abort_run() {
    let content = "code,gross_price\nA,1\nB,2\n";
    let engine = engine_with_rules(
        "pattern_match:\n  code:\n    pattern: \"(\"\nnot_null: [code]\n",
    );
    let report = engine.validate_bytes("err.csv", content.as_bytes());

    assert!(report.error.is_none());
    assert_eq!(report.summary.total_checks, 2);
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.summary.passed, 1);
    assert!(!report.is_ok());
}

#[test]
fn test_date_freshness_with_fixed_clock() {
    let content = "code,date\nA,2024-05-30\nB,2023-01-15\nC,garbage\n";
    let engine = engine_with_rules("date_within_days:\n  column: date\n  max_days: 90\n");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let report = engine.validate_bytes_at("dates.csv", content.as_bytes(), now);

    let check = &report.checks[0];
    assert_eq!(check.rule, "date_within_days");
    assert_eq!(check.status, CheckStatus::Fail);
    assert_eq!(check.details["old_dates_count"], 1);
    assert_eq!(check.details["unparsed_count"], 1);
}

#[test]
fn test_simple_profile_required_columns() {
    let content = "code,gross_price\nA,1\n";
    let report = builtin_engine().validate_bytes("simple.csv", content.as_bytes());

    let check = &report.checks[0];
    assert_eq!(check.rule, "required_columns");
    assert_eq!(check.status, CheckStatus::Fail);
    assert_eq!(check.details["missing_columns"], serde_json::json!(["code_system"]));
    assert!(!report.schema_ok);
    assert!(report.structure.is_none());
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_idempotent_reports() {
    let engine = builtin_engine();
    let first = engine.validate_bytes("tall.csv", STANDARD_TALL.as_bytes());
    let mut second = engine.validate_bytes("tall.csv", STANDARD_TALL.as_bytes());
    second.timestamp = first.timestamp;

    assert_eq!(first, second);
    assert_eq!(
        first.to_json_pretty().unwrap(),
        second.to_json_pretty().unwrap()
    );
}

#[test]
fn test_summary_matches_checks() {
    let report = builtin_engine().validate_bytes("tall.csv", STANDARD_TALL.as_bytes());

    let passed = report
        .checks
        .iter()
        .filter(|c| c.status == CheckStatus::Pass)
        .count();
    assert_eq!(report.summary.total_checks, report.checks.len());
    assert_eq!(report.summary.passed, passed);
    assert_eq!(
        report.summary.passed + report.summary.failed + report.summary.errors,
        report.summary.total_checks
    );
}

#[test]
fn test_report_json_shape() {
    let report = builtin_engine().validate_bytes("tall.csv", STANDARD_TALL.as_bytes());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["layout"], "tall");
    assert_eq!(json["profile"], "standard");
    assert_eq!(json["header_row"], 2);
    assert!(json["source"]["hash"].as_str().unwrap().starts_with("sha256:"));
    assert!(json.get("error").is_none());
    assert!(json["checks"].is_array());
}

// =============================================================================
// Fatal Runs
// =============================================================================

#[test]
fn test_malformed_registry_yields_fatal_report() {
    let mut rules = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    rules.write_all(b"not_null: [code\n").unwrap();
    let data = create_test_file(STANDARD_TALL);

    let report = validate_file(&EngineConfig::default(), Some(rules.path()), data.path());

    assert!(report.error.is_some());
    assert!(report.checks.is_empty());
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.summary.total_checks, 0);
}

#[test]
fn test_missing_file_yields_fatal_report() {
    let report = builtin_engine().validate_path("/nonexistent/standardcharges.csv");

    assert!(report.is_fatal());
    assert!(report.error.unwrap().contains("IO error"));
}

#[test]
fn test_validate_file_with_builtin_rules() {
    let data = create_test_file(STANDARD_TALL);
    let report = validate_file(&EngineConfig::default(), None, data.path());

    assert!(report.error.is_none());
    assert!(report.schema_ok);
    assert_eq!(report.rules_version, "1.0.0");
}
