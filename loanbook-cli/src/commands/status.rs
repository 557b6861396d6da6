//! Status command - show loan book status and summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_context, get_logger, log_event};
use loanbook_core::LogEvent;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let today = ctx.config.resolve_window(Some(1), None)?.reference_date;
    let status = ctx.status_service.get_status(today)?;

    log_event(&logger, LogEvent::new("command_executed").with_command("status"));

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Loan Book Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Clients", &status.total_clients.to_string()]);
    table.add_row(vec![
        &format!("Active on {}", today),
        &status.active_clients.to_string(),
    ]);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);

    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!("Ledger dates: {} to {}", earliest, latest);
    }

    Ok(())
}
