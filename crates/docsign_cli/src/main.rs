//! Operator CLI for the signing store.
//!
//! # Responsibility
//! - Verify `docsign_core` linkage and schema state from a shell.
//! - Run the link/signature reconciliation sweep on demand.

use clap::{Parser, Subcommand};
use docsign_core::{
    db::migrations::{latest_version, schema_version},
    init_from_config, open_db, LifecycleService, ReconcileReport, ServiceConfig,
    SqliteSigningStore, SystemClock,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "docsign", version, about = "Document signing store tooling")]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage and version.
    Ping,
    /// Report the database schema version.
    Status,
    /// Detect and repair link/signature disagreement.
    Reconcile {
        /// Limit the sweep to one document.
        #[arg(long, value_name = "DOCUMENT_ID")]
        document: Option<Uuid>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match cli.config.as_deref() {
        Some(path) => ServiceConfig::load(path).map_err(|err| err.to_string())?,
        None => ServiceConfig::default(),
    };
    init_from_config(&config).map_err(|err| err.to_string())?;

    match cli.command {
        Command::Ping => {
            println!("docsign_core ping={}", docsign_core::ping());
            println!("docsign_core version={}", docsign_core::core_version());
            Ok(())
        }
        Command::Status => {
            let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
            let version = schema_version(&conn).map_err(|err| err.to_string())?;
            println!("database={}", config.database_path.display());
            println!("schema_version={version} latest={}", latest_version());
            Ok(())
        }
        Command::Reconcile { document } => {
            let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
            let store = SqliteSigningStore::try_new(&conn).map_err(|err| err.to_string())?;
            let lifecycle = LifecycleService::new(store, Arc::new(SystemClock));
            info!(
                "event=cli_reconcile module=cli status=start scope={}",
                document.map_or_else(|| "all".to_string(), |id| id.to_string())
            );

            let reports = match document {
                Some(id) => vec![lifecycle.reconcile_document(id).map_err(|err| err.to_string())?],
                None => lifecycle.reconcile_all().map_err(|err| err.to_string())?,
            };
            print_reports(&reports);
            Ok(())
        }
    }
}

fn print_reports(reports: &[ReconcileReport]) {
    let inconsistent: Vec<_> = reports.iter().filter(|r| !r.is_consistent()).collect();
    if inconsistent.is_empty() {
        println!("reconcile: no disagreements found");
        return;
    }
    for report in inconsistent {
        println!(
            "document={} findings={} repaired={}",
            report.document_id,
            report.findings.len(),
            report.repaired
        );
        for finding in &report.findings {
            println!("  {finding:?}");
        }
    }
}
