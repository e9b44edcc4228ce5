use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use registrar_common::report::{add_report, error_report, list_report, search_report};
use registrar_common::store::DEFAULT_FILE;
use registrar_common::{RegistrationError, RegistrationStore};

/// Registrar registration CLI.
///
/// Adds, lists and searches registrations kept in a CSV registrations file.
#[derive(Parser, Debug)]
#[command(name = "registrar", version, about)]
struct Cli {
    /// Path of the registrations CSV file
    #[arg(long, global = true, env = "REGISTRAR_FILE", default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// Print JSON instead of text reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a person
    Add {
        /// Full name
        name: String,
        /// Email address (must not already be registered)
        email: String,
        /// Date of birth (YYYY-MM-DD)
        dob: String,
    },
    /// List all registrations in insertion order
    List,
    /// Find registrations whose name or email contains QUERY (case-insensitive)
    Search {
        /// Name or email fragment
        query: String,
    },
    /// Check whether an email is already registered
    Exists {
        /// Email address to look up
        email: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    let store = RegistrationStore::open(&cli.file)
        .with_context(|| format!("failed to open registrations file {}", cli.file.display()))?;

    match cli.command {
        Commands::Add {
            ref name,
            ref email,
            ref dob,
        } => {
            let outcome = store.add(name, email, dob);
            match outcome {
                Ok(ref record) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(record)?);
                    } else {
                        println!("{}", add_report(&outcome));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    let Some(body) = rejection_json(&e) else {
                        return Err(anyhow::Error::new(e).context("failed to store registration"));
                    };
                    if cli.json {
                        eprintln!("{}", serde_json::to_string_pretty(&body)?);
                    } else {
                        eprintln!("{}", error_report(&e));
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::List => {
            let records = store.list().context("failed to read registrations")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("{}", list_report(&Ok(records)));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search { ref query } => {
            let found = store
                .search(query)
                .context("failed to search registrations")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                println!("{}", search_report(query, &Ok(found)));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exists { ref email } => {
            let exists = store
                .email_exists(email)
                .context("failed to read registrations")?;
            if cli.json {
                println!("{}", json!({ "email": email.trim(), "exists": exists }));
            } else if exists {
                println!("{} is registered", email.trim());
            } else {
                println!("{} is not registered", email.trim());
            }
            Ok(if exists {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// JSON body describing why an `add` was refused.
///
/// `None` for storage faults, which are errors rather than rejections.
fn rejection_json(err: &RegistrationError) -> Option<serde_json::Value> {
    match err {
        RegistrationError::ValidationFailed(errors) => Some(json!({
            "error": "validation_failed",
            "details": errors,
        })),
        RegistrationError::DuplicateEmail { email } => Some(json!({
            "error": "duplicate_email",
            "email": email,
        })),
        RegistrationError::StorageUnavailable { .. } => None,
    }
}
