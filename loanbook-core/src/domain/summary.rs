//! Derived per-day and per-client collection results
//!
//! These are computed fresh on every query and never persisted. Amounts are
//! raw decimals and dates serialize as `YYYY-MM-DD`; formatting belongs to
//! the presentation layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::Client;

/// An active client with at least one qualifying transaction on the day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidClient {
    pub client_id: String,
    pub client_name: String,
    pub daily_payment: Decimal,
    /// Sum of all qualifying transactions for this client on the day
    pub actual_amount_paid: Decimal,
}

/// An active client with no qualifying transaction on the day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidClient {
    pub client_id: String,
    pub client_name: String,
    pub daily_payment: Decimal,
}

impl UnpaidClient {
    pub fn from_client(client: &Client) -> Self {
        Self {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            daily_payment: client.daily_payment,
        }
    }
}

/// Paid/unpaid partition of the active roster for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub paid_clients: Vec<PaidClient>,
    pub unpaid_clients: Vec<UnpaidClient>,
    pub total_collected: Decimal,
    /// Sum of daily payments over every active client
    pub expected_total: Decimal,
}

impl DaySummary {
    pub fn active_count(&self) -> usize {
        self.paid_clients.len() + self.unpaid_clients.len()
    }

    pub fn is_paid(&self, client_id: &str) -> bool {
        self.paid_clients.iter().any(|p| p.client_id == client_id)
    }

    pub fn is_unpaid(&self, client_id: &str) -> bool {
        self.unpaid_clients.iter().any(|u| u.client_id == client_id)
    }

    pub fn paid_amount(&self, client_id: &str) -> Option<Decimal> {
        self.paid_clients
            .iter()
            .find(|p| p.client_id == client_id)
            .map(|p| p.actual_amount_paid)
    }
}

/// A client's current run of active-and-unpaid days
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedStreak {
    pub client_id: String,
    pub client_name: String,
    pub phone: Option<String>,
    pub streak_length: u32,
    /// `streak_length × daily_payment`
    pub total_missed: Decimal,
}

/// Aggregates over a whole window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTotals {
    pub total_collected: Decimal,
    pub total_expected: Decimal,
    /// Client-days marked paid
    pub paid_count: usize,
    /// Client-days marked unpaid
    pub unpaid_count: usize,
    /// Collected as a percentage of expected, 0 when nothing was expected
    pub collection_rate: Decimal,
}

impl WindowTotals {
    /// Sums saturate at `Decimal::MAX`
    pub fn from_days(days: &[DaySummary]) -> Self {
        let total_collected = days
            .iter()
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.total_collected));
        let total_expected = days
            .iter()
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.expected_total));

        Self {
            total_collected,
            total_expected,
            paid_count: days.iter().map(|d| d.paid_clients.len()).sum(),
            unpaid_count: days.iter().map(|d| d.unpaid_clients.len()).sum(),
            collection_rate: collection_rate(total_collected, total_expected),
        }
    }
}

fn collection_rate(collected: Decimal, expected: Decimal) -> Decimal {
    if expected.is_zero() {
        return Decimal::ZERO;
    }
    collected
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(expected))
        .or_else(|| {
            collected
                .checked_div(expected)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        })
        .unwrap_or(Decimal::MAX)
        .round_dp(2)
}

/// Everything the presentation layer needs for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub reference_date: NaiveDate,
    pub window_days: u32,
    /// Oldest first
    pub days: Vec<DaySummary>,
    /// Longest streak first
    pub streaks: Vec<MissedStreak>,
    pub totals: WindowTotals,
}
