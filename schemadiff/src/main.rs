//! Schema comparison tool.
//!
//! Compares a source schema against a target schema, each given as a live
//! connection string or a `dir:` directory of DDL scripts, and optionally
//! writes the script that makes the target match the source.
//!
//! # Guarantees
//! - Live databases are only read, never modified
//! - Ephemeral databases are dropped before the process exits
//! - No credentials are logged

use anyhow::Context;
use clap::Parser;
use schemadiff::{
    CheckArgs, Cli, Command, CompareArgs, EXIT_DIFFERENT, EXIT_ERROR, EXIT_IDENTICAL,
    describe_reference,
};
use schemadiff_core::logging::init_with;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    init_with(&cli.global.log_settings()).context("Failed to initialize logging")?;

    match &cli.command {
        Command::Compare(args) => compare(args).await,
        Command::Check(args) => {
            check(args);
            Ok(EXIT_IDENTICAL)
        }
    }
}

#[cfg(feature = "postgresql")]
async fn compare(args: &CompareArgs) -> anyhow::Result<u8> {
    use schemadiff_core::CompareOrchestrator;

    let orchestrator =
        CompareOrchestrator::postgres(args.ephemeral_config(), args.connection_config())
            .context("Invalid configuration")?;

    let outcome = match orchestrator
        .compare(&args.source, &args.target, &args.compare_options())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            // A refused write still completed the comparison
            if !args.json {
                for line in e.report() {
                    println!("{}", line);
                }
            }
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for line in &outcome.report {
            println!("{}", line);
        }
    }

    Ok(if outcome.has_differences {
        EXIT_DIFFERENT
    } else {
        EXIT_IDENTICAL
    })
}

#[cfg(not(feature = "postgresql"))]
async fn compare(_args: &CompareArgs) -> anyhow::Result<u8> {
    anyhow::bail!("schemadiff was built without a database backend (enable the postgresql feature)")
}

/// Reports what each reference resolves to without connecting anywhere
fn check(args: &CheckArgs) {
    info!("Checking schema references");
    println!("source: {}", describe_reference(&args.source));
    println!("target: {}", describe_reference(&args.target));
}
