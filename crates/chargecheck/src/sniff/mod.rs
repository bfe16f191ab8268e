//! Structure sniffing: locate the preamble block and the true header row
//! inside a bounded file prefix.
//!
//! Price-transparency exports often open with free-form metadata rows
//! (hospital name, last-updated date, template version) before the column
//! headers. The sniffer parses the first lines of the prefix into a
//! [`ScanWindow`] and runs an ordered list of [`Heuristic`]s over it; the
//! first heuristic that accepts wins. When none accept, the first non-empty
//! line is the header and the preamble is empty, so every input yields a
//! deterministic result.

mod heuristics;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input::parse_row;

pub use heuristics::{DomainPreamble, GenericMetadata, Heuristic, KeyHeaderVocabulary};

/// Configuration for structure sniffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SniffConfig {
    /// How many candidate lines to try as the start of a preamble.
    pub max_scan_lines: usize,
    /// Preamble labels recognized by the domain heuristic (lower-case).
    pub required_labels: Vec<String>,
    /// Substrings marking organizational metadata labels.
    pub entity_vocabulary: Vec<String>,
    /// Substrings marking data column headers.
    pub data_header_vocabulary: Vec<String>,
    /// Exact header names used by the vocabulary-only heuristic.
    pub key_headers: Vec<String>,
    /// Minimum key header hits for the vocabulary-only heuristic.
    pub min_key_header_hits: usize,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            max_scan_lines: 30,
            required_labels: strings(&[
                "hospital_name",
                "last_updated_on",
                "version",
                "hospital_location",
                "hospital_address",
                "license_number",
                "mrf date",
                "cms template version",
            ]),
            entity_vocabulary: strings(&[
                "hospital", "name", "location", "address", "license", "updated", "version",
            ]),
            data_header_vocabulary: strings(&["code", "description", "charge", "price", "payer"]),
            key_headers: strings(&[
                "billing_code",
                "billing_code_type",
                "description",
                "standard_charge",
                "payer",
                "de-identified",
            ]),
            min_key_header_hits: 3,
        }
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Outcome of sniffing a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SniffResult {
    /// Zero-based physical line index of the column header row.
    pub header_row: usize,
    /// Preamble labels (lower-cased) mapped to their values.
    pub preamble: IndexMap<String, String>,
    /// Trimmed header cells, original casing.
    pub header_cells: Vec<String>,
    /// Which strategy located the header.
    pub method: String,
}

impl SniffResult {
    /// Header cells lower-cased, as used for layout classification.
    pub fn headers_lowercase(&self) -> Vec<String> {
        self.header_cells.iter().map(|h| h.to_lowercase()).collect()
    }
}

/// Parsed view of the first non-blank lines of a prefix.
///
/// Blank lines are dropped before scanning, so a preamble split by empty
/// lines still forms a triple. Each row keeps its physical line index.
/// Rows that fail to parse have `cells == None` and never become
/// candidates.
pub struct ScanWindow {
    rows: Vec<ScanRow>,
    max_scan: usize,
}

/// One non-blank line of the prefix.
pub struct ScanRow {
    /// Zero-based physical line index.
    pub line: usize,
    pub cells: Option<Vec<String>>,
}

/// Three consecutive non-blank rows; the third is the header candidate.
pub struct Triple<'a> {
    /// Physical line index of the header candidate.
    pub header_row: usize,
    pub labels: &'a [String],
    pub values: &'a [String],
    pub header: &'a [String],
}

impl ScanWindow {
    /// Parse up to `max_scan + 2` non-blank lines so every candidate has
    /// its triple.
    pub fn new(lines: &[&str], max_scan: usize, delimiter: u8) -> Self {
        let rows = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .take(max_scan.saturating_add(2))
            .map(|(line, text)| ScanRow {
                line,
                cells: parse_row(text, delimiter),
            })
            .collect();
        Self { rows, max_scan }
    }

    /// Non-blank rows in line order.
    pub fn rows(&self) -> &[ScanRow] {
        &self.rows
    }

    /// Candidate (labels, values, header) triples with all three rows
    /// parsed.
    pub fn triples(&self) -> impl Iterator<Item = Triple<'_>> {
        self.rows
            .windows(3)
            .take(self.max_scan)
            .filter_map(|w| {
                Some(Triple {
                    header_row: w[2].line,
                    labels: w[0].cells.as_deref()?,
                    values: w[1].cells.as_deref()?,
                    header: w[2].cells.as_deref()?,
                })
            })
    }
}

/// Runs the ordered heuristics over a prefix.
pub struct Sniffer {
    heuristics: Vec<Box<dyn Heuristic + Send + Sync>>,
    max_scan: usize,
}

impl Sniffer {
    /// Build the default heuristic chain from configuration.
    pub fn new(config: &SniffConfig) -> Self {
        Self {
            heuristics: vec![
                Box::new(DomainPreamble::new(&config.required_labels)),
                Box::new(GenericMetadata::new(
                    &config.entity_vocabulary,
                    &config.data_header_vocabulary,
                )),
                Box::new(KeyHeaderVocabulary::new(
                    &config.key_headers,
                    config.min_key_header_hits,
                )),
            ],
            max_scan: config.max_scan_lines,
        }
    }

    /// Build a sniffer with an explicit heuristic chain.
    pub fn with_heuristics(
        heuristics: Vec<Box<dyn Heuristic + Send + Sync>>,
        max_scan: usize,
    ) -> Self {
        Self {
            heuristics,
            max_scan,
        }
    }

    /// Locate the header row in the given prefix lines.
    pub fn sniff(&self, lines: &[&str], delimiter: u8) -> SniffResult {
        let window = ScanWindow::new(lines, self.max_scan, delimiter);

        for heuristic in &self.heuristics {
            if let Some(result) = heuristic.detect(&window) {
                debug!(
                    heuristic = heuristic.name(),
                    header_row = result.header_row,
                    preamble_labels = result.preamble.len(),
                    "header row located"
                );
                return result;
            }
        }

        let result = first_non_empty(lines, delimiter);
        debug!(header_row = result.header_row, "no heuristic matched, using first non-empty line");
        result
    }
}

/// Fallback: the first line with any non-empty cell is the header.
fn first_non_empty(lines: &[&str], delimiter: u8) -> SniffResult {
    let found = lines.iter().enumerate().find_map(|(i, line)| {
        let cells = parse_row(line, delimiter)?;
        cells
            .iter()
            .any(|c| !c.trim().is_empty())
            .then(|| (i, cells))
    });

    let (header_row, cells) = found.unwrap_or((0, Vec::new()));
    SniffResult {
        header_row,
        preamble: IndexMap::new(),
        header_cells: cells.iter().map(|c| c.trim().to_string()).collect(),
        method: "first_non_empty".to_string(),
    }
}

/// Sniff with a one-off sniffer built from `config`.
pub fn sniff(lines: &[&str], config: &SniffConfig, delimiter: u8) -> SniffResult {
    Sniffer::new(config).sniff(lines, delimiter)
}
