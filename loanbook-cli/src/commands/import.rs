//! Import command - import clients or transactions from CSV

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use loanbook_core::services::{ClientColumns, ImportResult, TransactionColumns};
use loanbook_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output::{success, warning};

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import the client directory
    Clients {
        /// Path to CSV file
        file: PathBuf,
        /// Column name for the client id
        #[arg(long)]
        id_column: Option<String>,
        /// Column name for the daily payment
        #[arg(long)]
        daily_payment_column: Option<String>,
        /// Preview without importing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import ledger transactions
    Transactions {
        /// Path to CSV file
        file: PathBuf,
        /// Column name for the client id
        #[arg(long)]
        client_column: Option<String>,
        /// Column name for the amount
        #[arg(long)]
        amount_column: Option<String>,
        /// Column name for the transaction date
        #[arg(long)]
        date_column: Option<String>,
        /// Preview without importing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ImportCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let (kind, file, preview, json, result) = match command {
        ImportCommands::Clients {
            file,
            id_column,
            daily_payment_column,
            preview,
            json,
        } => {
            let mut columns = ClientColumns::default();
            if let Some(col) = id_column {
                columns.id = col;
            }
            if let Some(col) = daily_payment_column {
                columns.daily_payment = col;
            }
            let result = ctx.import_service.import_clients(&file, &columns, preview);
            ("clients", file, preview, json, result)
        }
        ImportCommands::Transactions {
            file,
            client_column,
            amount_column,
            date_column,
            preview,
            json,
        } => {
            let mut columns = TransactionColumns::default();
            if let Some(col) = client_column {
                columns.client_id = col;
            }
            if let Some(col) = amount_column {
                columns.amount = col;
            }
            if let Some(col) = date_column {
                columns.date = col;
            }
            let result = ctx.import_service.import_transactions(&file, &columns, preview);
            ("transactions", file, preview, json, result)
        }
    };

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_command(format!("import {}", kind))
                    .with_error(e.to_string()),
            );
            return Err(e.context(format!("Failed to import {}", file.display())));
        }
    };

    if !preview {
        log_event(
            &logger,
            LogEvent::new("import_completed").with_command(format!("import {}", kind)),
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(kind, &result);
    Ok(())
}

fn print_result(kind: &str, result: &ImportResult) {
    if result.preview_only {
        println!("{}", "Preview only, nothing was written.".cyan());
        println!("  Would import {} {}", result.imported, kind);
    } else {
        success(&format!("Imported {} {}", result.imported, kind));
    }
    if result.skipped > 0 {
        warning(&format!("  Skipped {} unusable rows", result.skipped));
    }
    if result.incomplete > 0 {
        warning(&format!(
            "  {} rows had unreadable fields and will not count as collections",
            result.incomplete
        ));
    }
}
