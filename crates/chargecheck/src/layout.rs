//! Tall vs wide layout classification from header names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sniff::strings;

/// Structural layout of a price file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One row per price observation.
    Tall,
    /// One row per billing code with `payer|plan` price columns.
    Wide,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Tall => "tall",
            Layout::Wide => "wide",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for layout classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column count above which an unrecognized file is treated as wide.
    pub wide_column_threshold: usize,
    /// Separator joining payer and plan names in wide headers.
    pub payer_plan_separator: String,
    /// Tokens that qualify a separator-joined header as a payer/plan column.
    pub payer_plan_tokens: Vec<String>,
    /// Headers that indicate a tall file.
    pub tall_vocabulary: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            wide_column_threshold: 25,
            payer_plan_separator: "|".to_string(),
            payer_plan_tokens: strings(&["payer", "plan", "insurance", "hmo", "ppo"]),
            tall_vocabulary: strings(&[
                "billing_code_type",
                "billing_code",
                "description",
                "standard_charge",
                "payer",
                "plan",
                "payer_name",
                "plan_name",
            ]),
        }
    }
}

impl LayoutConfig {
    /// Whether a lower-cased header is a composite payer/plan column.
    pub fn is_payer_plan_column(&self, header: &str) -> bool {
        !self.payer_plan_separator.is_empty()
            && header.contains(self.payer_plan_separator.as_str())
            && self
                .payer_plan_tokens
                .iter()
                .any(|token| header.contains(token.as_str()))
    }
}

/// Classify a file's layout from its lower-cased header cells.
///
/// Composite payer/plan headers win outright. Otherwise any overlap with
/// the tall vocabulary means tall, and only then does raw column count
/// decide.
pub fn classify(headers: &[String], config: &LayoutConfig) -> Layout {
    if headers.iter().any(|h| config.is_payer_plan_column(h)) {
        return Layout::Wide;
    }

    let tall_hit = headers
        .iter()
        .any(|h| config.tall_vocabulary.iter().any(|v| v == h));
    if tall_hit {
        return Layout::Tall;
    }

    if headers.len() > config.wide_column_threshold {
        Layout::Wide
    } else {
        Layout::Tall
    }
}
