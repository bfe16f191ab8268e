//! CLI command implementations.

pub mod rules;
pub mod sniff;
pub mod validate;

use std::path::Path;

use chargecheck::EngineConfig;

/// How a command finished when it did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    /// A report was produced but is not ok.
    Failed,
}

pub type CommandResult = Result<Outcome, Box<dyn std::error::Error>>;

/// Engine config from `--config`, or the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => EngineConfig::from_path(p)?,
        None => EngineConfig::default(),
    })
}
