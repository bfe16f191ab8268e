//! Data source abstraction and metadata.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ChargecheckError, Result};

/// A columnar-readable dataset.
///
/// The schema must be enumerable without reading data rows, so a run can
/// detect its profile before paying for the full load.
pub trait DataSource {
    /// Column names at the header row.
    fn columns(&self) -> Result<Vec<String>>;

    /// Read every data row.
    fn load(&self) -> Result<DataTable>;
}

/// Metadata about the source data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Field delimiter used for parsing.
    pub delimiter: String,
}

impl SourceMetadata {
    /// Hash a file on disk in a single streaming pass.
    pub fn from_path(path: &Path, format: &str, delimiter: u8) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| ChargecheckError::io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        let mut size_bytes = 0u64;

        loop {
            let n = file.read(&mut buf).map_err(|e| ChargecheckError::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
        }

        Ok(Self::build(
            file_name(path),
            format!("sha256:{:x}", hasher.finalize()),
            size_bytes,
            format,
            delimiter,
        ))
    }

    /// Metadata for an in-memory buffer.
    pub fn from_bytes(name: &str, bytes: &[u8], format: &str, delimiter: u8) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self::build(
            name.to_string(),
            format!("sha256:{:x}", hasher.finalize()),
            bytes.len() as u64,
            format,
            delimiter,
        )
    }

    fn build(file: String, hash: String, size_bytes: u64, format: &str, delimiter: u8) -> Self {
        Self {
            file,
            hash,
            size_bytes,
            format: format.to_string(),
            delimiter: (delimiter as char).to_string(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

/// Represents parsed tabular data.
#[derive(Debug, Clone)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
    /// The delimiter used.
    pub delimiter: u8,
}

impl DataTable {
    /// Create a new data table.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Whether a cell is missing or holds a null token.
    pub fn is_null(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_none_or(Self::is_null_value)
    }

    /// Render a row as a column -> value map. Null cells become JSON null.
    pub fn row_as_map(&self, row: usize) -> IndexMap<String, Value> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = match self.get(row, col) {
                    Some(v) if !Self::is_null_value(v) => Value::String(v.to_string()),
                    _ => Value::Null,
                };
                (header.clone(), value)
            })
            .collect()
    }

    /// Check if a value represents a missing/null value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nil")
            || trimmed == "."
            || trimmed == "-"
    }

    /// Parse a cell as a number, returning `None` for nulls and non-numeric text.
    pub fn numeric_value(value: &str) -> Option<f64> {
        if Self::is_null_value(value) {
            return None;
        }
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}
