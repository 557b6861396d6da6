//! Import service - CSV import for the client directory and transaction ledger

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{Client, ClientStatus, Transaction};

/// Date formats tried, in order, before any configured extras
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Column names for client CSV files (matched case-insensitively)
#[derive(Debug, Clone)]
pub struct ClientColumns {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub loan_amount: String,
    pub daily_payment: String,
    pub balance: String,
    pub start_date: String,
    pub status: String,
}

impl Default for ClientColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            name: "name".to_string(),
            phone: "phone".to_string(),
            address: "address".to_string(),
            loan_amount: "loan_amount".to_string(),
            daily_payment: "daily_payment".to_string(),
            balance: "balance".to_string(),
            start_date: "start_date".to_string(),
            status: "status".to_string(),
        }
    }
}

/// Column names for transaction CSV files (matched case-insensitively)
#[derive(Debug, Clone)]
pub struct TransactionColumns {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub amount: String,
    pub date: String,
    pub status: String,
    pub notes: String,
    pub is_new_loan: String,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            client_id: "client_id".to_string(),
            client_name: "client_name".to_string(),
            amount: "amount".to_string(),
            date: "date".to_string(),
            status: "status".to_string(),
            notes: "notes".to_string(),
            is_new_loan: "is_new_loan".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    /// Rows that could not be used at all
    pub skipped: usize,
    /// Rows stored with one or more unreadable fields
    pub incomplete: usize,
    pub preview_only: bool,
}

/// Import service for CSV imports
pub struct ImportService {
    repository: Arc<DuckDbRepository>,
    extra_date_formats: Vec<String>,
}

impl ImportService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self {
            repository,
            extra_date_formats: Vec::new(),
        }
    }

    /// Also accept these chrono formats when parsing dates
    pub fn with_date_formats(mut self, formats: Vec<String>) -> Self {
        self.extra_date_formats = formats;
        self
    }

    /// Import clients. Rows without an id or with invalid loan terms are skipped.
    pub fn import_clients(
        &self,
        file_path: &Path,
        columns: &ClientColumns,
        preview_only: bool,
    ) -> Result<ImportResult> {
        let mut reader = csv::Reader::from_path(file_path).context("Failed to read CSV file")?;
        let headers = reader.headers()?.clone();

        let id_idx = require_column(&headers, &columns.id)?;
        let name_idx = require_column(&headers, &columns.name)?;
        let loan_idx = require_column(&headers, &columns.loan_amount)?;
        let daily_idx = require_column(&headers, &columns.daily_payment)?;
        let phone_idx = find_column(&headers, &columns.phone);
        let address_idx = find_column(&headers, &columns.address);
        let balance_idx = find_column(&headers, &columns.balance);
        let start_idx = find_column(&headers, &columns.start_date);
        let status_idx = find_column(&headers, &columns.status);

        let mut clients = Vec::new();
        let mut skipped = 0;
        let mut incomplete = 0;

        for result in reader.records() {
            let record = result?;

            let id = field(&record, Some(id_idx));
            let (Some(id), Some(loan_amount), Some(daily_payment)) = (
                id,
                field(&record, Some(loan_idx)).and_then(parse_amount),
                field(&record, Some(daily_idx)).and_then(parse_amount),
            ) else {
                skipped += 1;
                continue;
            };

            let start_raw = field(&record, start_idx);
            let start_date = start_raw.and_then(|s| self.parse_date(s));
            let mut is_incomplete = start_raw.is_some() && start_date.is_none();

            // A blank status cell is malformed and leaves the client inactive;
            // a file without a status column lists active clients only.
            let status = match (status_idx, field(&record, status_idx)) {
                (None, _) => ClientStatus::Active,
                (Some(_), Some(raw)) => ClientStatus::parse(raw),
                (Some(_), None) => {
                    is_incomplete = true;
                    ClientStatus::default()
                }
            };

            let client = Client {
                id: id.to_string(),
                name: field(&record, Some(name_idx)).unwrap_or_default().to_string(),
                phone: field(&record, phone_idx).map(str::to_string),
                address: field(&record, address_idx).map(str::to_string),
                loan_amount,
                daily_payment,
                balance: field(&record, balance_idx)
                    .and_then(parse_amount)
                    .unwrap_or(loan_amount),
                start_date,
                status,
            };

            if let Err(e) = client.validate() {
                tracing::debug!(client_id = %client.id, error = %e, "skipping client row");
                skipped += 1;
                continue;
            }
            if is_incomplete {
                incomplete += 1;
            }
            clients.push(client);
        }

        if !preview_only {
            self.repository.upsert_clients(&clients)?;
        }

        tracing::info!(
            imported = clients.len(),
            skipped,
            incomplete,
            preview_only,
            "client import finished"
        );

        Ok(ImportResult {
            imported: clients.len(),
            skipped,
            incomplete,
            preview_only,
        })
    }

    /// Import transactions. Malformed fields are stored as missing rather than
    /// rejecting the row; the reconciliation treats them as non-qualifying.
    pub fn import_transactions(
        &self,
        file_path: &Path,
        columns: &TransactionColumns,
        preview_only: bool,
    ) -> Result<ImportResult> {
        let mut reader = csv::Reader::from_path(file_path).context("Failed to read CSV file")?;
        let headers = reader.headers()?.clone();

        let date_idx = require_column(&headers, &columns.date)?;
        let amount_idx = require_column(&headers, &columns.amount)?;
        let client_idx = require_column(&headers, &columns.client_id)?;
        let id_idx = find_column(&headers, &columns.id);
        let name_idx = find_column(&headers, &columns.client_name);
        let status_idx = find_column(&headers, &columns.status);
        let notes_idx = find_column(&headers, &columns.notes);
        let new_loan_idx = find_column(&headers, &columns.is_new_loan);

        let mut transactions = Vec::new();
        let mut incomplete = 0;

        for result in reader.records() {
            let record = result?;

            let amount_raw = field(&record, Some(amount_idx));
            let date_raw = field(&record, Some(date_idx));
            let tx = Transaction {
                id: field(&record, id_idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                client_id: field(&record, Some(client_idx)).map(str::to_string),
                client_name: field(&record, name_idx).map(str::to_string),
                amount: amount_raw.and_then(parse_amount),
                date: date_raw.and_then(|s| self.parse_date(s)),
                status: field(&record, status_idx).map(str::to_string),
                notes: field(&record, notes_idx).map(str::to_string),
                is_new_loan: field(&record, new_loan_idx).map_or(false, parse_flag),
            };

            if tx.amount.is_none() || tx.date.is_none() || tx.client_id.is_none() {
                incomplete += 1;
            }
            transactions.push(tx);
        }

        if !preview_only {
            self.repository.upsert_transactions(&transactions)?;
        }

        tracing::info!(
            imported = transactions.len(),
            incomplete,
            preview_only,
            "transaction import finished"
        );

        Ok(ImportResult {
            imported: transactions.len(),
            skipped: 0,
            incomplete,
            preview_only,
        })
    }

    fn parse_date(&self, s: &str) -> Option<NaiveDate> {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .or_else(|| {
                self.extra_date_formats
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            })
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn require_column(headers: &StringRecord, name: &str) -> Result<usize> {
    find_column(headers, name).with_context(|| format!("Column '{}' not found", name))
}

/// Trimmed, non-empty field value
fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Largest magnitude a stored amount column (DECIMAL(18, 2)) can hold
fn max_stored_amount() -> Decimal {
    Decimal::new(999_999_999_999_999_999, 2)
}

/// Parse an amount, tolerating currency symbols and thousands separators.
/// Amounts too large to store are treated as unreadable.
fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();

    // Parentheses notation for negatives: (100.00) -> -100.00
    let (in_parens, s) = match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };

    // The number starts at the first digit; anything before it is a
    // currency prefix such as "Rs." or "TSh", possibly with a sign
    let (prefix, rest) = s.split_at(s.find(|c: char| c.is_ascii_digit())?);
    let is_negative = in_parens || prefix.contains('-');

    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(*c, '.' | ',' | ' '))
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let amount = Decimal::from_str(digits.trim_end_matches('.')).ok()?;
    let amount = if is_negative { -amount } else { amount };
    (amount.round_dp(2).abs() <= max_stored_amount()).then_some(amount)
}

fn parse_flag(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("5000"), Some(Decimal::new(5000, 0)));
        assert_eq!(parse_amount("TSh 150,000.50"), Some(Decimal::new(15000050, 2)));
        assert_eq!(parse_amount("(200)"), Some(Decimal::new(-200, 0)));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("Rs. 5000"), Some(Decimal::new(5000, 0)));
        assert_eq!(parse_amount("Rs. -1,250.5"), Some(Decimal::new(-12505, 1)));
        assert_eq!(parse_amount("5 000 TSh."), Some(Decimal::new(5000, 0)));
    }

    #[test]
    fn test_parse_amount_rejects_unstorable_values() {
        assert_eq!(parse_amount("99999999999999999999"), None);
        assert_eq!(
            parse_amount("9999999999999999.99"),
            Some(Decimal::new(999_999_999_999_999_999, 2))
        );
        assert_eq!(parse_amount("-10000000000000000"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn test_parse_date_with_extra_formats() {
        let service = ImportService::new(Arc::new(DuckDbRepository::in_memory().unwrap()))
            .with_date_formats(vec!["%d.%m.%Y".to_string()]);
        let expected = NaiveDate::from_ymd_opt(2024, 6, 10);
        assert_eq!(service.parse_date("2024-06-10"), expected);
        assert_eq!(service.parse_date("06/10/2024"), expected);
        assert_eq!(service.parse_date("10.06.2024"), expected);
        assert_eq!(service.parse_date("yesterday"), None);
    }
}
