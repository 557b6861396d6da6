//! Daily command - who paid and who didn't, day by day

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;

use super::{get_logger, get_report_context, log_report, resolve_window};
use crate::output::{create_table, format_amount, info};

pub fn run(days: Option<i64>, date: Option<NaiveDate>, json: bool, verbose: bool) -> Result<()> {
    let ctx = get_report_context(verbose)?;
    let logger = get_logger();
    let window = resolve_window(&ctx, &logger, "daily", days, date)?;

    let summaries = ctx.collection_service.daily_summaries(&window)?;
    log_report(&logger, "daily", &window);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.iter().all(|d| d.active_count() == 0) {
        info(&format!(
            "No active clients between {} and {}.",
            window.start_date(),
            window.reference_date
        ));
        return Ok(());
    }

    // Newest first reads better at a terminal
    for day in summaries.iter().rev() {
        println!(
            "{}  {} of {} paid, collected {} of {}",
            day.date.format("%a %Y-%m-%d").to_string().bold(),
            day.paid_clients.len(),
            day.active_count(),
            format_amount(day.total_collected).green(),
            format_amount(day.expected_total)
        );

        if day.active_count() == 0 {
            println!();
            continue;
        }

        let mut table = create_table();
        table.set_header(vec!["Client", "Name", "Due", "Paid"]);
        for paid in &day.paid_clients {
            table.add_row(vec![
                paid.client_id.clone(),
                paid.client_name.clone(),
                format_amount(paid.daily_payment),
                format_amount(paid.actual_amount_paid).green().to_string(),
            ]);
        }
        for unpaid in &day.unpaid_clients {
            table.add_row(vec![
                unpaid.client_id.clone(),
                unpaid.client_name.clone(),
                format_amount(unpaid.daily_payment),
                "unpaid".red().to_string(),
            ]);
        }
        println!("{}", table);
        println!();
    }

    Ok(())
}
