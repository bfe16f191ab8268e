//! Sniff command - show what the structural stages detect in a file.

use std::path::PathBuf;

use chargecheck::rules::RulesDocument;
use chargecheck::{Engine, RuleRegistry};
use colored::Colorize;

use super::{load_config, CommandResult, Outcome};

pub fn run(file: PathBuf, config: Option<PathBuf>, json: bool, verbose: bool) -> CommandResult {
    let config = load_config(config.as_deref())?;
    // Detection never consults the rules, an empty registry is enough.
    let engine = Engine::new(config, RuleRegistry::from_document(RulesDocument::default())?);
    let detection = engine.detect_path(&file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(Outcome::Clean);
    }

    println!(
        "{} {}",
        "Structure of".cyan().bold(),
        file.display().to_string().white()
    );
    println!();
    println!("  Format:     {} (delimiter {:?})", detection.format, detection.delimiter);
    println!(
        "  Header row: {} {}",
        detection.header_row.to_string().white().bold(),
        format!("via {}", detection.sniff_method).dimmed()
    );
    println!("  Layout:     {}", detection.layout.to_string().white());
    println!(
        "  Profile:    {} ({})",
        detection.profile.to_string().white(),
        detection.profile.description()
    );
    println!("  Columns:    {}", detection.headers.len());

    if !detection.preamble.is_empty() {
        println!();
        println!("{}", "Preamble:".yellow().bold());
        for (label, value) in &detection.preamble {
            println!("  {}: {}", label, value);
        }
    }

    println!();
    println!("{}", "Canonical mapping:".yellow().bold());
    if detection.column_mapping.is_empty() {
        println!("  {}", "(no canonical fields recognised)".dimmed());
    }
    for (field, actual) in detection.column_mapping.iter() {
        println!("  {:<18} <- {}", field.as_str().green(), actual);
    }

    if verbose {
        println!();
        println!("{}", "Headers:".yellow().bold());
        for header in &detection.headers {
            println!("  {}", header);
        }
    }

    Ok(Outcome::Clean)
}
