//! Status service - loan book summary

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::adapters::duckdb::{DateRange, DuckDbRepository};

/// Status service for loan book summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Counts of clients and transactions as of `today`
    pub fn get_status(&self, today: NaiveDate) -> Result<StatusSummary> {
        let clients = self.repository.get_clients()?;
        let transaction_count = self.repository.get_transaction_count()?;
        let date_range = self.repository.get_transaction_date_range()?;

        Ok(StatusSummary {
            total_clients: clients.len() as i64,
            active_clients: clients.iter().filter(|c| c.is_active_on(today)).count() as i64,
            total_transactions: transaction_count,
            date_range,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_clients: i64,
    pub active_clients: i64,
    pub total_transactions: i64,
    pub date_range: DateRange,
}
