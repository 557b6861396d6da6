//! Config command - show or change settings.json

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use loanbook_core::config::Config;
use loanbook_core::LogEvent;

use super::{get_loanbook_dir, get_logger, log_event};
use crate::output::success;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the saved settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change saved settings; options left out keep their current value
    Set {
        /// Default number of days a report covers
        #[arg(long)]
        window_days: Option<u32>,
        /// Pin the reference date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_reference_date")]
        reference_date: Option<NaiveDate>,
        /// Go back to using today's date
        #[arg(long)]
        clear_reference_date: bool,
        /// Emit a tracing event for every classified transaction
        #[arg(long)]
        trace_classification: Option<bool>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let loanbook_dir = get_loanbook_dir()?;
    std::fs::create_dir_all(&loanbook_dir)?;
    let logger = get_logger();

    // Environment overrides are never written back
    let mut config = Config::load_saved(&loanbook_dir)?;

    match command {
        ConfigCommands::Show { json } => print(&config, json),
        ConfigCommands::Set {
            window_days,
            reference_date,
            clear_reference_date,
            trace_classification,
            json,
        } => {
            if let Some(days) = window_days {
                config.resolve_window(Some(i64::from(days)), None)?;
                config.default_window_days = days;
            }
            if let Some(date) = reference_date {
                config.reference_date = Some(date);
            }
            if clear_reference_date {
                config.reference_date = None;
            }
            if let Some(enabled) = trace_classification {
                config.trace_classification = enabled;
            }

            config.save(&loanbook_dir)?;
            log_event(&logger, LogEvent::new("command_executed").with_command("config set"));

            if !json {
                success("Settings saved");
            }
            print(&config, json)
        }
    }
}

fn print(config: &Config, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "defaultWindowDays": config.default_window_days,
                "referenceDate": config.reference_date,
                "traceClassification": config.trace_classification,
                "dateFormats": config.import.date_formats,
            })
        );
        return Ok(());
    }

    println!("{}", "Settings".bold());
    println!("  Window days:          {}", config.default_window_days);
    println!(
        "  Reference date:       {}",
        config
            .reference_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "today".to_string())
    );
    println!("  Trace classification: {}", config.trace_classification);
    if !config.import.date_formats.is_empty() {
        println!("  Extra date formats:   {}", config.import.date_formats.join(", "));
    }
    Ok(())
}
