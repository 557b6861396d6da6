//! Daily aggregator - partitions the active roster into paid and unpaid
//! clients for every day of a window
//!
//! Amount sums saturate at `Decimal::MAX`.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::classifier::{classify, ClassificationObserver, NoopObserver};
use crate::domain::result::Result;
use crate::domain::{Client, DaySummary, PaidClient, Transaction, UnpaidClient, Window};

/// Build one `DaySummary` per day of the window, oldest first.
///
/// Fails only when `window_days` is not positive.
pub fn build_daily_summaries(
    clients: &[Client],
    transactions: &[Transaction],
    window_days: i64,
    reference_date: NaiveDate,
) -> Result<Vec<DaySummary>> {
    let window = Window::new(window_days, reference_date)?;
    Ok(summarize_window(clients, transactions, &window, &NoopObserver))
}

/// Same as [`build_daily_summaries`], reporting each classification to `observer`
pub fn build_daily_summaries_with_observer(
    clients: &[Client],
    transactions: &[Transaction],
    window_days: i64,
    reference_date: NaiveDate,
    observer: &dyn ClassificationObserver,
) -> Result<Vec<DaySummary>> {
    let window = Window::new(window_days, reference_date)?;
    Ok(summarize_window(clients, transactions, &window, observer))
}

/// Summaries for an already validated window, oldest first
pub fn summarize_window(
    clients: &[Client],
    transactions: &[Transaction],
    window: &Window,
    observer: &dyn ClassificationObserver,
) -> Vec<DaySummary> {
    let roster: HashMap<&str, &Client> = clients.iter().map(|c| (c.id.as_str(), c)).collect();

    // Qualifying amounts per day per client. Transactions outside the window,
    // without a date or with an unknown client never reach the classifier.
    let mut collected: HashMap<NaiveDate, BTreeMap<&str, Decimal>> = HashMap::new();
    for tx in transactions {
        let Some(date) = tx.date.filter(|d| window.contains(*d)) else {
            continue;
        };
        let Some(client) = tx.client_ref().and_then(|id| roster.get(id).copied()) else {
            continue;
        };

        let outcome = classify(tx, Some(client));
        observer.on_classified(tx, &outcome);
        if !outcome.is_qualifying() {
            continue;
        }
        if let Some(amount) = tx.amount {
            let sum = collected
                .entry(date)
                .or_default()
                .entry(client.id.as_str())
                .or_insert(Decimal::ZERO);
            *sum = sum.saturating_add(amount);
        }
    }

    let mut days: Vec<DaySummary> = window
        .days_newest_first()
        .map(|day| summarize_day(clients, day, collected.get(&day)))
        .collect();
    days.reverse();
    days
}

fn summarize_day(
    clients: &[Client],
    day: NaiveDate,
    collected: Option<&BTreeMap<&str, Decimal>>,
) -> DaySummary {
    let mut paid_clients = Vec::new();
    let mut unpaid_clients = Vec::new();
    let mut expected_total = Decimal::ZERO;

    for client in clients.iter().filter(|c| c.is_active_on(day)) {
        expected_total = expected_total.saturating_add(client.daily_payment);
        match collected.and_then(|m| m.get(client.id.as_str())) {
            Some(amount) => paid_clients.push(PaidClient {
                client_id: client.id.clone(),
                client_name: client.name.clone(),
                daily_payment: client.daily_payment,
                actual_amount_paid: *amount,
            }),
            None => unpaid_clients.push(UnpaidClient::from_client(client)),
        }
    }

    // Qualifying payments from clients that are not active on the day are
    // not attributed to anyone and stay out of the total.
    let total_collected = paid_clients
        .iter()
        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.actual_amount_paid));

    DaySummary {
        date: day,
        paid_clients,
        unpaid_clients,
        total_collected,
        expected_total,
    }
}
