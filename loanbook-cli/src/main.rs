//! Loanbook CLI - daily collection reconciliation in your terminal

use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{clients, config, daily, import, logs, report, status, streaks};

/// Loanbook - daily collection reconciliation for microfinance loan books
#[derive(Parser)]
#[command(name = "lb", version, about, long_about = None)]
struct Cli {
    /// Print classification and storage diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show loan book status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show who paid and who didn't, day by day
    Daily {
        /// Number of days to look back, including the reference date
        #[arg(long, short = 'd')]
        days: Option<i64>,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List clients with consecutive missed payments
    Streaks {
        /// Number of days to look back, including the reference date
        #[arg(long, short = 'd')]
        days: Option<i64>,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only show streaks at least this long
        #[arg(long, default_value = "1")]
        min: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a full collection report for a window
    Report {
        /// Number of days to look back, including the reference date
        #[arg(long, short = 'd')]
        days: Option<i64>,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or remove clients
    Clients {
        #[command(subcommand)]
        command: clients::ClientsCommands,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Import clients or transactions from CSV
    Import {
        #[command(subcommand)]
        command: import::ImportCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Daily { days, date, json } => daily::run(days, date, json, verbose),
        Commands::Streaks { days, date, min, json } => {
            streaks::run(days, date, min, json, verbose)
        }
        Commands::Report { days, date, json } => report::run(days, date, json, verbose),
        Commands::Clients { command } => clients::run(command),
        Commands::Config { command } => config::run(command),
        Commands::Import { command } => import::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
