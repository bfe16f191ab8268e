use std::collections::HashSet;

use indexmap::IndexMap;

use super::{ScanWindow, SniffResult, Triple};

/// A strategy for locating the header row.
///
/// Heuristics are pure: they see only the scan window and either accept
/// with a result or decline.
pub trait Heuristic {
    fn name(&self) -> &'static str;

    fn detect(&self, window: &ScanWindow) -> Option<SniffResult>;
}

fn lowered(cells: &[String]) -> Vec<String> {
    cells.iter().map(|c| c.trim().to_lowercase()).collect()
}

fn trimmed(cells: &[String]) -> Vec<String> {
    cells.iter().map(|c| c.trim().to_string()).collect()
}

/// Pair label cells with value cells, keeping pairs where both are present.
/// Later duplicate labels overwrite earlier ones.
fn pair_preamble(labels: &[String], values: &[String]) -> IndexMap<String, String> {
    let mut preamble = IndexMap::new();
    for (label, value) in labels.iter().zip(values) {
        let key = label.trim().to_lowercase();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            preamble.insert(key, value.to_string());
        }
    }
    preamble
}

fn accept(triple: &Triple<'_>, method: &str) -> SniffResult {
    SniffResult {
        header_row: triple.header_row,
        preamble: pair_preamble(triple.labels, triple.values),
        header_cells: trimmed(triple.header),
        method: method.to_string(),
    }
}

/// Labels row drawn from the known preamble vocabulary, followed by a
/// values row of the same width.
pub struct DomainPreamble {
    labels: HashSet<String>,
}

impl DomainPreamble {
    pub fn new(labels: &[String]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.trim().to_lowercase()).collect(),
        }
    }
}

impl Heuristic for DomainPreamble {
    fn name(&self) -> &'static str {
        "domain_preamble"
    }

    fn detect(&self, window: &ScanWindow) -> Option<SniffResult> {
        window
            .triples()
            .find(|t| {
                let hits = lowered(t.labels)
                    .iter()
                    .filter(|c| self.labels.contains(*c))
                    .count();
                hits >= 2 && t.labels.len() == t.values.len()
            })
            .map(|t| accept(&t, self.name()))
    }
}

/// Entity-looking labels, a same-width values row, then a row that reads
/// like data column headers.
pub struct GenericMetadata {
    entity: Vec<String>,
    data: Vec<String>,
}

impl GenericMetadata {
    pub fn new(entity: &[String], data: &[String]) -> Self {
        Self {
            entity: entity.iter().map(|s| s.to_lowercase()).collect(),
            data: data.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn hits(cells: &[String], vocabulary: &[String]) -> usize {
        lowered(cells)
            .iter()
            .filter(|c| vocabulary.iter().any(|token| c.contains(token.as_str())))
            .count()
    }
}

impl Heuristic for GenericMetadata {
    fn name(&self) -> &'static str {
        "generic_metadata"
    }

    fn detect(&self, window: &ScanWindow) -> Option<SniffResult> {
        window
            .triples()
            .find(|t| {
                Self::hits(t.labels, &self.entity) >= 2
                    && t.labels.len() == t.values.len()
                    && Self::hits(t.header, &self.data) >= 2
            })
            .map(|t| accept(&t, self.name()))
    }
}

/// A row containing enough exact key header names, with no preamble.
pub struct KeyHeaderVocabulary {
    headers: HashSet<String>,
    min_hits: usize,
}

impl KeyHeaderVocabulary {
    pub fn new(headers: &[String], min_hits: usize) -> Self {
        Self {
            headers: headers.iter().map(|h| h.trim().to_lowercase()).collect(),
            min_hits: min_hits.max(1),
        }
    }
}

impl Heuristic for KeyHeaderVocabulary {
    fn name(&self) -> &'static str {
        "key_header_vocabulary"
    }

    fn detect(&self, window: &ScanWindow) -> Option<SniffResult> {
        window.rows().iter().find_map(|row| {
            let cells = row.cells.as_deref()?;
            let hits = lowered(cells)
                .iter()
                .filter(|c| self.headers.contains(*c))
                .count();
            (hits >= self.min_hits).then(|| SniffResult {
                header_row: row.line,
                preamble: IndexMap::new(),
                header_cells: trimmed(cells),
                method: self.name().to_string(),
            })
        })
    }
}
