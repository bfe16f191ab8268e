//! Delimited-text parsing: single-row parsing for the sniffer, delimiter
//! detection, and full loads starting at a header row offset.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::source::{DataSource, DataTable};
use crate::error::{ChargecheckError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parse one physical line as a delimited row.
///
/// Returns `None` when the quoting is unbalanced; an empty line yields an
/// empty row.
pub fn parse_row(line: &str, delimiter: u8) -> Option<Vec<String>> {
    if line.bytes().filter(|&b| b == b'"').count() % 2 != 0 {
        return None;
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Some(record.iter().map(|s| s.to_string()).collect()),
        Ok(false) => Some(Vec::new()),
        Err(_) => None,
    }
}

/// Human label for a delimiter.
pub fn format_name(delimiter: u8) -> &'static str {
    match delimiter {
        b'\t' => "tsv",
        b',' => "csv",
        b';' => "csv-semicolon",
        b'|' => "psv",
        _ => "delimited",
    }
}

/// Detect the delimiter by analyzing the given lines.
///
/// Preamble rows usually carry fewer fields than the data, so consistency
/// is scored but not required. Falls back to comma.
pub fn detect_delimiter(lines: &[&str]) -> u8 {
    let lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if lines.is_empty() {
        return b',';
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        // Pipes inside wide payer|plan headers are not field separators.
        if delim == b'|' && lines.iter().any(|l| count_delimiter_in_line(l, b',') > 0) {
            continue;
        }

        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let max_count = counts.iter().copied().max().unwrap_or(0);
        if max_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == counts[0]);
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance =
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64;

        // Higher count with lower variance is better; tab gets a slight bonus
        // as it's less common in actual data.
        let score = if consistent {
            max_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else if variance < 1.0 {
            max_count * 100
        } else {
            max_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    best_delimiter
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

/// Where a CSV source reads its bytes from.
#[derive(Debug, Clone)]
pub enum CsvInput<'a> {
    Path(PathBuf),
    Bytes(&'a [u8]),
}

/// A delimited file whose column header sits `header_row` physical lines
/// into the file.
#[derive(Debug, Clone)]
pub struct CsvSource<'a> {
    input: CsvInput<'a>,
    header_row: usize,
    delimiter: u8,
}

impl<'a> CsvSource<'a> {
    /// Source backed by a file on disk.
    pub fn from_path(path: impl AsRef<Path>, header_row: usize, delimiter: u8) -> Self {
        Self {
            input: CsvInput::Path(path.as_ref().to_path_buf()),
            header_row,
            delimiter,
        }
    }

    /// Source backed by an in-memory buffer.
    pub fn from_bytes(bytes: &'a [u8], header_row: usize, delimiter: u8) -> Self {
        Self {
            input: CsvInput::Bytes(bytes),
            header_row,
            delimiter,
        }
    }

    /// The header row offset this source skips to.
    pub fn header_row(&self) -> usize {
        self.header_row
    }

    fn open(&self) -> Result<Box<dyn BufRead + 'a>> {
        let mut reader: Box<dyn BufRead + 'a> = match &self.input {
            CsvInput::Path(path) => {
                let file = File::open(path).map_err(|e| ChargecheckError::io(path, e))?;
                Box::new(BufReader::new(file))
            }
            CsvInput::Bytes(bytes) => Box::new(*bytes),
        };

        let mut discarded = Vec::new();
        for line in 0..self.header_row {
            discarded.clear();
            let n = reader
                .read_until(b'\n', &mut discarded)
                .map_err(|e| ChargecheckError::io(self.display_path(), e))?;
            if n == 0 {
                return Err(ChargecheckError::EmptyData(format!(
                    "file ended at line {} before header row {}",
                    line, self.header_row
                )));
            }
        }

        Ok(reader)
    }

    fn csv_reader(&self) -> Result<csv::Reader<Box<dyn BufRead + 'a>>> {
        let reader = self.open()?;
        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader))
    }

    fn display_path(&self) -> PathBuf {
        match &self.input {
            CsvInput::Path(path) => path.clone(),
            CsvInput::Bytes(_) => PathBuf::from("<memory>"),
        }
    }
}

fn clean_header(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim()
        .trim_matches('\u{feff}')
        .to_string()
}

impl DataSource for CsvSource<'_> {
    fn columns(&self) -> Result<Vec<String>> {
        let mut reader = self.csv_reader()?;
        let headers: Vec<String> = reader.byte_headers()?.iter().map(clean_header).collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ChargecheckError::EmptyData(format!(
                "No columns found at header row {}",
                self.header_row
            )));
        }

        Ok(headers)
    }

    fn load(&self) -> Result<DataTable> {
        let mut reader = self.csv_reader()?;
        let headers: Vec<String> = reader.byte_headers()?.iter().map(clean_header).collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ChargecheckError::EmptyData(format!(
                "No columns found at header row {}",
                self.header_row
            )));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();

        for result in reader.byte_records() {
            let record = result?;
            let mut row: Vec<String> = record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect();

            // Pad row if needed
            while row.len() < expected_cols {
                row.push(String::new());
            }
            // Truncate if too many columns
            row.truncate(expected_cols);

            rows.push(row);
        }

        debug!(
            rows = rows.len(),
            columns = expected_cols,
            header_row = self.header_row,
            "loaded dataset"
        );

        Ok(DataTable::new(headers, rows, self.delimiter))
    }
}
