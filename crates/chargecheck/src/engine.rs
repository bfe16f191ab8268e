//! Validation engine and its configuration.
//!
//! An [`Engine`] is built once per process from an [`EngineConfig`] and a
//! [`RuleRegistry`], then shared by reference across runs. Each run goes
//! prefix -> sniff -> layout -> profile/mapping -> load -> rules -> report
//! strictly in sequence. Fatal errors inside a run are converted to an
//! error-shaped report at this boundary, so callers always get a report.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ChargecheckError, Result};
use crate::input::{
    detect_delimiter, format_name, CsvSource, DataSource, FileKind, RawPrefix, SourceMetadata,
};
use crate::layout::{classify, Layout, LayoutConfig};
use crate::profile::{detect_profile, map_to_canonical, FieldMapping, Profile};
use crate::report::{Summary, ValidationReport};
use crate::rules::{evaluate_all, EvaluationContext, RuleRegistry};
use crate::sniff::{SniffConfig, Sniffer};
use crate::structure::{check_structure, StructureConfig, StructureInput};

/// Lines of the prefix used for delimiter detection.
const DELIMITER_SAMPLE_LINES: usize = 50;

/// Headers echoed in a report.
const MAX_REPORTED_HEADERS: usize = 200;

/// Process-wide engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes read from the start of each file for structure sniffing.
    pub prefix_bytes: usize,
    /// Field delimiter; detected from the prefix when unset.
    pub delimiter: Option<char>,
    pub sniff: SniffConfig,
    pub layout: LayoutConfig,
    pub structure: StructureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix_bytes: 200_000,
            delimiter: None,
            sniff: SniffConfig::default(),
            layout: LayoutConfig::default(),
            structure: StructureConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ChargecheckError::io(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml_ng::from_str(&text)?),
            Some("json") => Ok(serde_json::from_str(&text)?),
            _ => Err(ChargecheckError::Config(format!(
                "unsupported config extension for {}",
                path.display()
            ))),
        }
    }

    /// Configured delimiter as a byte, if any.
    fn delimiter_byte(&self) -> Result<Option<u8>> {
        match self.delimiter {
            None => Ok(None),
            Some(c) if c.is_ascii() => Ok(Some(c as u8)),
            Some(c) => Err(ChargecheckError::Config(format!(
                "delimiter '{c}' is not a single-byte character"
            ))),
        }
    }
}

/// What the structural stages decided about a file, before any rule runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub format: String,
    pub delimiter: String,
    pub header_row: usize,
    /// Heuristic that located the header row.
    pub sniff_method: String,
    pub preamble: IndexMap<String, String>,
    /// Column names at the header row, as the dataset reports them.
    pub headers: Vec<String>,
    pub layout: Layout,
    pub profile: Profile,
    pub column_mapping: FieldMapping,
}

/// Where a run reads its file from.
#[derive(Clone, Copy)]
enum RunInput<'a> {
    Path(&'a Path),
    Bytes { name: &'a str, bytes: &'a [u8] },
}

impl<'a> RunInput<'a> {
    fn label(&self) -> String {
        match self {
            RunInput::Path(path) => path.display().to_string(),
            RunInput::Bytes { name, .. } => name.to_string(),
        }
    }

    fn prefix(&self, max_bytes: usize) -> Result<RawPrefix> {
        match self {
            RunInput::Path(path) => RawPrefix::read(path, max_bytes),
            RunInput::Bytes { bytes, .. } => Ok(RawPrefix::from_bytes(bytes, max_bytes)),
        }
    }

    fn source(&self, header_row: usize, delimiter: u8) -> CsvSource<'a> {
        match *self {
            RunInput::Path(path) => CsvSource::from_path(path, header_row, delimiter),
            RunInput::Bytes { bytes, .. } => CsvSource::from_bytes(bytes, header_row, delimiter),
        }
    }

    fn metadata(&self, delimiter: u8) -> Result<SourceMetadata> {
        let format = format_name(delimiter);
        match self {
            RunInput::Path(path) => SourceMetadata::from_path(path, format, delimiter),
            RunInput::Bytes { name, bytes } => {
                Ok(SourceMetadata::from_bytes(name, bytes, format, delimiter))
            }
        }
    }
}

/// Runs validations. Holds no mutable state, so one engine can serve
/// many concurrent runs.
pub struct Engine {
    config: EngineConfig,
    registry: RuleRegistry,
    sniffer: Sniffer,
}

impl Engine {
    pub fn new(config: EngineConfig, registry: RuleRegistry) -> Self {
        let sniffer = Sniffer::new(&config.sniff);
        Self {
            config,
            registry,
            sniffer,
        }
    }

    /// Engine using the rule registry bundled with the crate.
    pub fn with_builtin_rules(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(config, RuleRegistry::builtin()?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run only the structural stages on a file.
    pub fn detect_path(&self, path: impl AsRef<Path>) -> Result<Detection> {
        self.detect(RunInput::Path(path.as_ref())).map(|(d, ..)| d)
    }

    /// Run only the structural stages on an in-memory buffer.
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<Detection> {
        self.detect(RunInput::Bytes {
            name: "<memory>",
            bytes,
        })
        .map(|(d, ..)| d)
    }

    pub fn validate_path(&self, path: impl AsRef<Path>) -> ValidationReport {
        self.validate_path_at(path, Utc::now())
    }

    /// Validate a file with an explicit reference time.
    pub fn validate_path_at(&self, path: impl AsRef<Path>, now: DateTime<Utc>) -> ValidationReport {
        self.validate_input(RunInput::Path(path.as_ref()), now)
    }

    pub fn validate_bytes(&self, name: &str, bytes: &[u8]) -> ValidationReport {
        self.validate_bytes_at(name, bytes, Utc::now())
    }

    /// Validate a buffer with an explicit reference time.
    pub fn validate_bytes_at(&self, name: &str, bytes: &[u8], now: DateTime<Utc>) -> ValidationReport {
        self.validate_input(RunInput::Bytes { name, bytes }, now)
    }

    fn validate_input(&self, input: RunInput<'_>, now: DateTime<Utc>) -> ValidationReport {
        info!(file = %input.label(), rules_version = self.registry.version(), "validation started");
        match self.run(input, now) {
            Ok(report) => {
                info!(
                    file = %input.label(),
                    rows = report.total_rows,
                    checks = report.summary.total_checks,
                    failed = report.summary.failed,
                    errors = report.summary.errors,
                    "validation finished"
                );
                report
            }
            Err(e) => {
                warn!(file = %input.label(), error = %e, "validation aborted");
                ValidationReport::fatal(self.registry.version(), None, e, now)
            }
        }
    }

    fn detect<'a>(&self, input: RunInput<'a>) -> Result<(Detection, CsvSource<'a>, u8)> {
        let prefix = input.prefix(self.config.prefix_bytes)?;

        match FileKind::sniff(prefix.text().as_bytes()) {
            kind @ (FileKind::Json | FileKind::Xml) => {
                return Err(ChargecheckError::UnsupportedFormat(format!(
                    "{} input is not a delimited file",
                    kind.label()
                )));
            }
            FileKind::Csv | FileKind::Unknown => {}
        }

        let lines = prefix.lines();
        let delimiter = match self.config.delimiter_byte()? {
            Some(d) => d,
            None => detect_delimiter(&lines[..lines.len().min(DELIMITER_SAMPLE_LINES)]),
        };

        let sniffed = self.sniffer.sniff(&lines, delimiter);
        let layout = classify(&sniffed.headers_lowercase(), &self.config.layout);

        let source = input.source(sniffed.header_row, delimiter);
        let headers = source.columns()?;
        let profile = detect_profile(&headers);
        let column_mapping = map_to_canonical(&headers, profile);
        debug!(
            header_row = sniffed.header_row,
            %layout,
            %profile,
            mapped = column_mapping.len(),
            "structure detected"
        );

        let detection = Detection {
            format: format_name(delimiter).to_string(),
            delimiter: (delimiter as char).to_string(),
            header_row: sniffed.header_row,
            sniff_method: sniffed.method,
            preamble: sniffed.preamble,
            headers,
            layout,
            profile,
            column_mapping,
        };
        Ok((detection, source, delimiter))
    }

    fn run(&self, input: RunInput<'_>, now: DateTime<Utc>) -> Result<ValidationReport> {
        let (detection, source, delimiter) = self.detect(input)?;
        let metadata = input.metadata(delimiter)?;
        let table = source.load()?;

        let max_failing_rows = self.registry.max_failing_rows();
        let structure = (detection.profile == Profile::Standard).then(|| {
            let structure_input = StructureInput {
                layout: detection.layout,
                preamble: &detection.preamble,
                table: &table,
                max_samples: max_failing_rows,
            };
            check_structure(&structure_input, &self.config.structure, &self.config.layout)
        });

        let ctx = EvaluationContext {
            table: &table,
            mapping: &detection.column_mapping,
            profile: detection.profile,
            max_failing_rows,
            now: now.naive_utc(),
        };
        let checks = evaluate_all(self.registry.rules_for(detection.profile), &ctx);
        let summary = Summary::aggregate(&checks);

        let header_ids: HashSet<&str> = self
            .registry
            .header_rules(detection.profile)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        let schema_ok = checks
            .iter()
            .filter(|c| header_ids.contains(c.rule.as_str()))
            .all(|c| c.is_pass());

        Ok(ValidationReport {
            timestamp: now,
            rules_version: self.registry.version().to_string(),
            source: Some(metadata),
            total_rows: table.row_count(),
            profile: Some(detection.profile),
            profile_description: Some(detection.profile.description().to_string()),
            layout: Some(detection.layout),
            header_row: Some(detection.header_row),
            headers: detection
                .headers
                .iter()
                .take(MAX_REPORTED_HEADERS)
                .map(|h| h.to_lowercase())
                .collect(),
            preamble: detection.preamble,
            column_mapping: detection.column_mapping,
            schema_ok,
            structure,
            checks,
            summary,
            error: None,
        })
    }
}

/// Validate one file, loading rules from `rules_path` or the built-in
/// registry. Registry failures come back as an error-shaped report.
pub fn validate_file(
    config: &EngineConfig,
    rules_path: Option<&Path>,
    path: impl AsRef<Path>,
) -> ValidationReport {
    let registry = match rules_path {
        Some(p) => RuleRegistry::from_path(p),
        None => RuleRegistry::builtin(),
    };

    match registry {
        Ok(registry) => Engine::new(config.clone(), registry).validate_path(path),
        Err(e) => {
            warn!(error = %e, "failed to load rule registry");
            ValidationReport::fatal("unknown", None, e, Utc::now())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckStatus;

    const TALL: &str = "hospital_name,last_updated_on,version\nAcme General,2024-01-01,2.0.0\nbilling_code,billing_code_type,description,standard_charge\n99213,CPT,Office visit,128.00\n99214,CPT,Office visit long,190.00\n";

    fn engine() -> Engine {
        Engine::with_builtin_rules(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_detect_bytes() {
        let detection = engine().detect_bytes(TALL.as_bytes()).unwrap();

        assert_eq!(detection.header_row, 2);
        assert_eq!(detection.layout, Layout::Tall);
        assert_eq!(detection.profile, Profile::Standard);
        assert_eq!(detection.delimiter, ",");
        assert_eq!(detection.column_mapping.get_by_name("gross_price"), Some("standard_charge"));
    }

    #[test]
    fn test_validate_bytes_report() {
        let report = engine().validate_bytes("tall.csv", TALL.as_bytes());

        assert!(report.error.is_none());
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.header_row, Some(2));
        assert!(report.schema_ok);
        assert_eq!(report.checks[0].rule, "required_headers");
        assert_eq!(report.checks[0].status, CheckStatus::Pass);
        assert_eq!(report.source.as_ref().unwrap().file, "tall.csv");
        assert!(report.structure.is_some());
        assert_eq!(report.summary.total_checks, report.checks.len());
    }

    #[test]
    fn test_json_input_is_fatal_report() {
        let report = engine().validate_bytes("data.json", b"{\"a\": 1}");

        assert!(report.is_fatal());
        assert_eq!(report.summary.errors, 1);
        assert!(report.checks.is_empty());
    }

    #[test]
    fn test_header_beyond_end_is_fatal() {
        let report = engine().validate_bytes("empty.csv", b"");
        assert!(report.is_fatal());
    }

    #[test]
    fn test_explicit_delimiter() {
        let config = EngineConfig {
            delimiter: Some(';'),
            ..EngineConfig::default()
        };
        let engine = Engine::with_builtin_rules(config).unwrap();
        let detection = engine.detect_bytes(b"code;gross_price\nA;1\n").unwrap();
        assert_eq!(detection.headers, vec!["code", "gross_price"]);
        assert_eq!(detection.format, "csv-semicolon");
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = EngineConfig {
            delimiter: Some('§'),
            ..EngineConfig::default()
        };
        let engine = Engine::with_builtin_rules(config).unwrap();
        assert!(engine.detect_bytes(b"a,b\n1,2\n").is_err());
    }

    #[test]
    fn test_config_from_yaml_partial() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"prefix_bytes: 1024\nlayout:\n  wide_column_threshold: 10\n",
        )
        .unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.prefix_bytes, 1024);
        assert_eq!(config.layout.wide_column_threshold, 10);
        assert_eq!(config.layout.payer_plan_separator, "|");
        assert_eq!(config.sniff.max_scan_lines, 30);
    }

    #[test]
    fn test_validate_file_with_bad_rules_path() {
        let mut data = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        std::io::Write::write_all(&mut data, TALL.as_bytes()).unwrap();

        let report = validate_file(
            &EngineConfig::default(),
            Some(Path::new("/nonexistent/registry.yaml")),
            data.path(),
        );
        assert!(report.is_fatal());
        assert_eq!(report.rules_version, "unknown");
    }
}
