//! Streaks command - clients with consecutive missed payments

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;

use super::{get_logger, get_report_context, log_report, resolve_window};
use crate::output::{create_table, format_amount, success};

pub fn run(
    days: Option<i64>,
    date: Option<NaiveDate>,
    min: u32,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let ctx = get_report_context(verbose)?;
    let logger = get_logger();
    let window = resolve_window(&ctx, &logger, "streaks", days, date)?;

    let streaks: Vec<_> = ctx
        .collection_service
        .missed_streaks(&window)?
        .into_iter()
        .filter(|s| s.streak_length >= min)
        .collect();
    log_report(&logger, "streaks", &window);

    if json {
        println!("{}", serde_json::to_string_pretty(&streaks)?);
        return Ok(());
    }

    if streaks.is_empty() {
        success(&format!(
            "No missed-payment streaks in the {} days to {}.",
            window.days, window.reference_date
        ));
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Missed payments, {} to {}",
            window.start_date(),
            window.reference_date
        )
        .bold()
    );

    let mut table = create_table();
    table.set_header(vec!["Client", "Name", "Phone", "Days", "Missed"]);
    for streak in &streaks {
        // Unpaid for the whole window; the streak may be longer
        let days = if streak.streak_length >= window.days {
            format!("{}+", streak.streak_length).red().to_string()
        } else {
            streak.streak_length.to_string()
        };
        table.add_row(vec![
            streak.client_id.clone(),
            streak.client_name.clone(),
            streak.phone.clone().unwrap_or_default(),
            days,
            format_amount(streak.total_missed),
        ]);
    }
    println!("{}", table);

    let total: Decimal = streaks.iter().map(|s| s.total_missed).sum();
    println!("Outstanding across {} clients: {}", streaks.len(), format_amount(total).red());

    Ok(())
}
