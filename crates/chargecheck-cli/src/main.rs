//! Chargecheck CLI - price-transparency file validation.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::Outcome;

fn init_tracing(verbose: bool) {
    let default = if verbose { "chargecheck=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            files,
            rules,
            config,
            format,
            output,
            jobs,
        } => commands::validate::run(files, rules, config, format, output, jobs, cli.verbose),

        Commands::Sniff { file, config, json } => {
            commands::sniff::run(file, config, json, cli.verbose)
        }

        Commands::Rules { path, json } => commands::rules::run(path, json, cli.verbose),
    };

    match result {
        Ok(Outcome::Clean) => {}
        Ok(Outcome::Failed) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
