//! Bounded file prefixes used for structure sniffing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChargecheckError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Leniently decoded first bytes of a file.
///
/// Only used to locate the header row; the dataset itself is always
/// loaded from the full source.
#[derive(Debug, Clone)]
pub struct RawPrefix {
    text: String,
    truncated: bool,
}

impl RawPrefix {
    /// Build a prefix from the first `max_bytes` of `bytes`.
    pub fn from_bytes(bytes: &[u8], max_bytes: usize) -> Self {
        let truncated = bytes.len() > max_bytes;
        let slice = &bytes[..bytes.len().min(max_bytes)];
        Self {
            text: decode_lenient(slice),
            truncated,
        }
    }

    /// Read at most `max_bytes` from the start of a file.
    pub fn read(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ChargecheckError::io(path, e))?;

        // One extra byte tells us whether the file continues past the cap.
        let mut buf = Vec::with_capacity(max_bytes.saturating_add(1).min(1 << 20));
        file.take((max_bytes as u64).saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(|e| ChargecheckError::io(path, e))?;

        Ok(Self::from_bytes(&buf, max_bytes))
    }

    /// The decoded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the source is longer than the prefix.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Physical lines of the prefix, excluding a trailing partial line when
    /// the prefix was cut mid-line.
    pub fn lines(&self) -> Vec<&str> {
        let mut lines: Vec<&str> = self.text.lines().collect();
        if self.truncated && !self.text.ends_with('\n') {
            lines.pop();
        }
        lines
    }
}

/// Decode bytes as UTF-8, dropping a leading BOM and any invalid sequences.
pub fn decode_lenient(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Coarse file kind guessed from the first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Json,
    Xml,
    Csv,
    Unknown,
}

impl FileKind {
    /// Classify a byte prefix.
    pub fn sniff(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let head = &bytes[start..bytes.len().min(start + 256)];

        match head.first() {
            Some(b'{') | Some(b'[') => FileKind::Json,
            Some(b'<') => FileKind::Xml,
            _ if head.iter().any(|&b| b == b',' || b == b'\n' || b == b'\r') => FileKind::Csv,
            _ => FileKind::Unknown,
        }
    }

    /// Short label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Json => "json",
            FileKind::Xml => "xml",
            FileKind::Csv => "csv",
            FileKind::Unknown => "unknown",
        }
    }
}
