//! Report command - collection report for a window

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_logger, get_report_context, log_report, resolve_window};
use crate::output::{create_table, format_amount};

pub fn run(days: Option<i64>, date: Option<NaiveDate>, json: bool, verbose: bool) -> Result<()> {
    let ctx = get_report_context(verbose)?;
    let logger = get_logger();
    let window = resolve_window(&ctx, &logger, "report", days, date)?;

    let report = ctx.collection_service.build_report(&window)?;
    log_report(&logger, "report", &window);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Collection Report: {} days to {}",
            report.window_days, report.reference_date
        )
        .bold()
    );
    println!();

    let totals = &report.totals;
    let mut summary = Table::new();
    summary.set_content_arrangement(ContentArrangement::Dynamic);
    summary.add_row(vec!["Collected".to_string(), format_amount(totals.total_collected)]);
    summary.add_row(vec!["Expected".to_string(), format_amount(totals.total_expected)]);
    summary.add_row(vec!["Collection rate".to_string(), format!("{}%", totals.collection_rate)]);
    summary.add_row(vec!["Payments received".to_string(), totals.paid_count.to_string()]);
    summary.add_row(vec!["Payments missed".to_string(), totals.unpaid_count.to_string()]);
    println!("{}", summary);
    println!();

    let mut table = create_table();
    table.set_header(vec!["Date", "Paid", "Unpaid", "Collected", "Expected"]);
    for day in &report.days {
        table.add_row(vec![
            day.date.to_string(),
            day.paid_clients.len().to_string(),
            day.unpaid_clients.len().to_string(),
            format_amount(day.total_collected),
            format_amount(day.expected_total),
        ]);
    }
    println!("{}", table);

    if !report.streaks.is_empty() {
        println!();
        println!("{}", "Missed-Payment Streaks".red().bold());
        for streak in &report.streaks {
            println!(
                "  {} ({}): {} days, {} outstanding",
                streak.client_name,
                streak.client_id,
                streak.streak_length,
                format_amount(streak.total_missed)
            );
        }
    }

    Ok(())
}
