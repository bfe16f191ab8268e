//! Validate command - run the rule registry over one or more price files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use chargecheck::{CheckStatus, Engine, RuleRegistry, Severity, ValidationReport};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{load_config, CommandResult, Outcome};
use crate::cli::OutputFormat;

pub fn run(
    files: Vec<PathBuf>,
    rules: Option<PathBuf>,
    config: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
    jobs: Option<usize>,
    verbose: bool,
) -> CommandResult {
    let config = load_config(config.as_deref())?;
    let registry = match &rules {
        Some(path) => RuleRegistry::from_path(path)?,
        None => RuleRegistry::builtin()?,
    };
    let engine = Engine::new(config, registry);

    let jobs = jobs
        .or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .clamp(1, files.len().max(1));
    debug!(files = files.len(), jobs, "validating");

    let reports = validate_all(&engine, &files, jobs)?;

    if let Some(dir) = &output {
        fs::create_dir_all(dir)?;
        for (target, report) in report_paths(dir, &files).iter().zip(&reports) {
            fs::write(target, report.to_json_pretty()?)?;
            if verbose {
                eprintln!("Wrote {}", target.display());
            }
        }
    }

    match format {
        OutputFormat::Json => {
            let json = if reports.len() == 1 {
                serde_json::to_string_pretty(&reports[0])?
            } else {
                serde_json::to_string_pretty(&reports)?
            };
            println!("{}", json);
        }
        OutputFormat::Human => {
            for (file, report) in files.iter().zip(&reports) {
                print_report(file, report, verbose);
            }
        }
    }

    Ok(if reports.iter().all(ValidationReport::is_ok) {
        Outcome::Clean
    } else {
        Outcome::Failed
    })
}

/// Validate files on a pool of `jobs` workers sharing one engine.
/// Reports come back in input order.
fn validate_all(
    engine: &Engine,
    files: &[PathBuf],
    jobs: usize,
) -> Result<Vec<ValidationReport>, Box<dyn std::error::Error>> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    Ok(pool.install(|| files.par_iter().map(|f| engine.validate_path(f)).collect()))
}

/// One `<stem>.validation.json` per input. Inputs sharing a stem get their
/// 1-based position appended so no report overwrites another.
fn report_paths(dir: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    let stems: Vec<String> = files
        .iter()
        .map(|f| f.file_stem().unwrap_or_default().to_string_lossy().into_owned())
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *seen.entry(stem.as_str()).or_insert(0) += 1;
    }

    stems
        .iter()
        .enumerate()
        .map(|(i, stem)| {
            if seen[stem.as_str()] > 1 {
                warn!(file = %files[i].display(), "report name shared with another input");
                dir.join(format!("{}-{}.validation.json", stem, i + 1))
            } else {
                dir.join(format!("{}.validation.json", stem))
            }
        })
        .collect()
}

fn print_report(file: &Path, report: &ValidationReport, verbose: bool) {
    println!(
        "{} {}",
        "Validation report for".cyan().bold(),
        file.display().to_string().white()
    );

    if let Some(error) = &report.error {
        println!("  {} {}", "Run failed:".red().bold(), error);
        println!();
        return;
    }

    if let Some(profile) = report.profile {
        println!("  Profile:    {} ({})", profile.to_string().white(), profile.description());
    }
    if let Some(layout) = report.layout {
        println!("  Layout:     {}", layout.to_string().white());
    }
    if let Some(row) = report.header_row {
        println!("  Header row: {}", row.to_string().white());
    }
    println!("  Rows:       {}", report.total_rows.to_string().white());
    println!(
        "  Schema:     {}",
        if report.schema_ok { "ok".green() } else { "missing required headers".red() }
    );
    println!();

    println!("{}", "Checks:".yellow().bold());
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => "PASS".green(),
            CheckStatus::Fail => match check.severity {
                Severity::Error => "FAIL".red(),
                Severity::Warning => "WARN".yellow(),
                Severity::Info => "INFO".blue(),
            },
            CheckStatus::Error => "ERROR".magenta(),
        };
        if check.is_pass() && !verbose {
            continue;
        }
        println!("  [{}] {}: {}", status.bold(), check.rule, check.message);
        if verbose {
            for row in &check.failing_rows {
                if let Ok(json) = serde_json::to_string(row) {
                    println!("        {}", json.dimmed());
                }
            }
        }
    }

    if let Some(structure) = &report.structure {
        if !structure.findings.is_empty() {
            println!();
            println!("{}", "Structure:".yellow().bold());
            for finding in &structure.findings {
                let label = match finding.severity {
                    Severity::Error => finding.severity.label().red(),
                    Severity::Warning => finding.severity.label().yellow(),
                    Severity::Info => finding.severity.label().blue(),
                };
                println!("  [{}] {}: {}", label, finding.rule, finding.message);
            }
        }
    }

    let summary = &report.summary;
    println!();
    println!(
        "Summary: {} checks, {} passed, {} failed, {} errors",
        summary.total_checks,
        summary.passed.to_string().green(),
        summary.failed.to_string().red(),
        summary.errors.to_string().magenta()
    );
    println!();
}
