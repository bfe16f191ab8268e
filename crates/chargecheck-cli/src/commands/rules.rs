//! Rules command - list the compiled definitions of a rule document.

use std::path::PathBuf;

use chargecheck::{Profile, RuleKind, RuleRegistry, Severity};
use colored::Colorize;
use serde_json::json;

use super::{CommandResult, Outcome};

pub fn run(path: Option<PathBuf>, json_output: bool, _verbose: bool) -> CommandResult {
    let registry = match &path {
        Some(p) => RuleRegistry::from_path(p)?,
        None => RuleRegistry::builtin()?,
    };
    let source = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    if json_output {
        let listing = json!({
            "source": source,
            "version": registry.version(),
            "max_failing_rows": registry.max_failing_rows(),
            "profiles": Profile::ALL
                .iter()
                .map(|p| json!({
                    "name": p.as_str(),
                    "alias": p.alias(),
                    "description": p.description(),
                }))
                .collect::<Vec<_>>(),
            "rules": registry.all_rules().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(Outcome::Clean);
    }

    println!(
        "{} {} {}",
        "Rule registry".cyan().bold(),
        source.white(),
        format!("(version {})", registry.version()).dimmed()
    );
    println!();

    for rule in registry.all_rules() {
        let severity = match rule.severity {
            Severity::Error => rule.severity.label().red(),
            Severity::Warning => rule.severity.label().yellow(),
            Severity::Info => rule.severity.label().blue(),
        };
        println!("  {:<40} {:<16} {}", rule.id.white(), rule.kind.name(), severity);
        if let RuleKind::RequiredHeaders { profile, .. } | RuleKind::RequiredColumns { profile, .. } =
            &rule.kind
        {
            println!(
                "      {}",
                format!("profile {} (document key {})", profile, profile.alias()).dimmed()
            );
        }
        if let Some(description) = &rule.description {
            println!("      {}", description.dimmed());
        }
    }

    println!();
    println!(
        "{} rules, failing-row samples capped at {}",
        registry.len().to_string().white().bold(),
        registry.max_failing_rows()
    );

    Ok(Outcome::Clean)
}
