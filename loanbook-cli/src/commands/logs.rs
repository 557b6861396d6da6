//! Logs command - inspect and prune the event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use loanbook_core::services::LogEntry;
use loanbook_core::{EntryPoint, LoggingService};

use super::get_loanbook_dir;
use crate::output::{create_table, info, success};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Delete entries older than this many days
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entry counts and where the log lives
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let loanbook_dir = get_loanbook_dir()?;
    std::fs::create_dir_all(&loanbook_dir)?;
    let service = LoggingService::new(&loanbook_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List { limit, errors, json } => list(&service, limit, errors, json),
        LogsCommands::Clear { older_than_days, json } => clear(&service, older_than_days, json),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn list(service: &LoggingService, limit: usize, errors_only: bool, json: bool) -> Result<()> {
    let entries = if errors_only {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        info("No log entries found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Time (UTC)", "Entry", "Event", "Context", "Error"]);
    for entry in &entries {
        table.add_row(vec![
            when(entry.timestamp),
            entry.entry_point.clone(),
            entry.event.clone(),
            context(entry),
            entry
                .error_message
                .as_deref()
                .map(|m| m.red().to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: u32, json: bool) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
    let deleted = service.delete_before(cutoff.timestamp_millis())?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        success(&format!(
            "Deleted {} log entries older than {} days",
            deleted, older_than_days
        ));
    }
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let total = service.count()?;
    let errors = service.count_errors()?;
    let db_path = service.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "total_entries": total,
                "error_count": errors,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            })
        );
        return Ok(());
    }

    println!("{}", "Event Log".bold());
    println!("  Entries:  {}", total);
    println!("  Errors:   {}", errors);
    println!("  Database: {} ({} bytes)", db_path.display(), size_bytes);
    Ok(())
}

fn when(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn context(entry: &LogEntry) -> String {
    match (entry.command.as_deref(), entry.window_days) {
        (Some(cmd), Some(days)) => format!("{} ({} days)", cmd, days),
        (Some(cmd), None) => cmd.to_string(),
        (None, Some(days)) => format!("{} days", days),
        (None, None) => String::new(),
    }
}
