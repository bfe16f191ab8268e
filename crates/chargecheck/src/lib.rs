//! Chargecheck: structure sniffing and rule-based validation for hospital
//! price-transparency CSV exports.
//!
//! A validation run locates the real header row behind any preamble
//! metadata, classifies the file as tall or wide, maps its columns onto a
//! canonical schema, and evaluates a declarative rule registry against the
//! loaded rows. The result is always a [`ValidationReport`], even when the
//! run cannot complete.
//!
//! # Example
//!
//! ```no_run
//! use chargecheck::{Engine, EngineConfig};
//!
//! let engine = Engine::with_builtin_rules(EngineConfig::default()).unwrap();
//! let report = engine.validate_path("standardcharges.csv");
//!
//! println!("Header row: {:?}", report.header_row);
//! println!("Passed {}/{}", report.summary.passed, report.summary.total_checks);
//! ```

pub mod error;
pub mod input;
pub mod layout;
pub mod profile;
pub mod report;
pub mod rules;
pub mod schema;
pub mod sniff;
pub mod structure;

mod engine;

pub use crate::engine::{validate_file, Detection, Engine, EngineConfig};
pub use error::{ChargecheckError, Result};
pub use input::{DataTable, RawPrefix, SourceMetadata};
pub use layout::{classify, Layout, LayoutConfig};
pub use profile::{detect_profile, map_to_canonical, normalize_header, CanonicalField, FieldMapping, Profile};
pub use report::{CheckResult, CheckStatus, Severity, Summary, ValidationReport};
pub use rules::{RuleDefinition, RuleKind, RuleRegistry};
pub use schema::ColumnType;
pub use sniff::{sniff, SniffConfig, SniffResult, Sniffer};
pub use structure::{StructureConfig, StructureReport};
