//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Client, ClientStatus, Transaction};
use crate::ports::{ClientDirectory, LoanBook, TransactionLedger};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const CLIENT_COLUMNS: &str = "client_id, name, phone, address, loan_amount::VARCHAR,
    daily_payment::VARCHAR, balance::VARCHAR, start_date::VARCHAR, status";

const TRANSACTION_COLUMNS: &str = "transaction_id, client_id, client_name, amount::VARCHAR,
    transaction_date::VARCHAR, status, notes, is_new_loan";

/// Earliest and latest transaction dates in the ledger
#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the loan book database
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process, e.g. a desktop app and the CLI opening it at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// In-memory database, mainly for tests and previews
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run pending migrations and report what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Client operations ===

    pub fn get_clients(&self) -> Result<Vec<Client>> {
        query_clients(&*self.lock()?)
    }

    pub fn get_client_by_id(&self, id: &str) -> Result<Option<Client>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_clients WHERE client_id = ?",
            CLIENT_COLUMNS
        ))?;

        let client = stmt.query_row([id], |row| Ok(row_to_client(row))).ok();
        Ok(client)
    }

    pub fn upsert_client(&self, client: &Client) -> Result<()> {
        write_client(&*self.lock()?, client)?;
        Ok(())
    }

    /// Upsert every client in one database transaction; nothing is written
    /// if any row fails
    pub fn upsert_clients(&self, clients: &[Client]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for client in clients {
            write_client(&tx, client)
                .with_context(|| format!("Failed to store client '{}'", client.id))?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a client and every transaction recorded against it
    pub fn delete_client(&self, client_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM sys_transactions WHERE client_id = ?",
            params![client_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM sys_clients WHERE client_id = ?",
            params![client_id],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    pub fn get_client_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_clients", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Transaction operations ===

    pub fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transactions ORDER BY transaction_date, transaction_id",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map([], |row| Ok(row_to_transaction(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(transactions)
    }

    /// Transactions dated within `[start, end]`; undated rows are left out
    pub fn get_transactions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        query_transactions_between(&*self.lock()?, start, end)
    }

    pub fn upsert_transaction(&self, tx: &Transaction) -> Result<()> {
        write_transaction(&*self.lock()?, tx)?;
        Ok(())
    }

    /// Upsert every transaction in one database transaction; nothing is
    /// written if any row fails
    pub fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;
        for tx in transactions {
            write_transaction(&db_tx, tx)
                .with_context(|| format!("Failed to store transaction '{}'", tx.id))?;
        }
        db_tx.commit()?;
        Ok(())
    }

    pub fn get_transaction_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_transaction_date_range(&self) -> Result<DateRange> {
        let conn = self.lock()?;
        let (earliest, latest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(transaction_date)::VARCHAR, MAX(transaction_date)::VARCHAR
             FROM sys_transactions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DateRange {
            earliest: earliest.as_deref().and_then(parse_date),
            latest: latest.as_deref().and_then(parse_date),
        })
    }
}

impl ClientDirectory for DuckDbRepository {
    fn clients(&self) -> Result<Vec<Client>> {
        self.get_clients()
    }
}

impl TransactionLedger for DuckDbRepository {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.get_transactions()
    }

    fn transactions_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        self.get_transactions_between(start, end)
    }
}

impl LoanBook for DuckDbRepository {
    /// Both reads happen under one connection lock, so no write lands between them
    fn snapshot_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Client>, Vec<Transaction>)> {
        let conn = self.lock()?;
        let clients = query_clients(&conn)?;
        let transactions = query_transactions_between(&conn, start, end)?;
        Ok((clients, transactions))
    }
}

fn query_clients(conn: &Connection) -> Result<Vec<Client>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sys_clients ORDER BY client_id",
        CLIENT_COLUMNS
    ))?;

    let clients = stmt
        .query_map([], |row| Ok(row_to_client(row)))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(clients)
}

fn query_transactions_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sys_transactions
         WHERE transaction_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
         ORDER BY transaction_date, transaction_id",
        TRANSACTION_COLUMNS
    ))?;

    let transactions = stmt
        .query_map(params![start.to_string(), end.to_string()], |row| {
            Ok(row_to_transaction(row))
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(transactions)
}

fn write_client(conn: &Connection, client: &Client) -> duckdb::Result<usize> {
    conn.execute(
        "INSERT INTO sys_clients (client_id, name, phone, address, loan_amount, daily_payment,
                                  balance, start_date, status)
         VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)),
                 CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), ?)
         ON CONFLICT (client_id) DO UPDATE SET
            name = EXCLUDED.name,
            phone = EXCLUDED.phone,
            address = EXCLUDED.address,
            loan_amount = EXCLUDED.loan_amount,
            daily_payment = EXCLUDED.daily_payment,
            balance = EXCLUDED.balance,
            start_date = EXCLUDED.start_date,
            status = EXCLUDED.status,
            updated_at = CURRENT_TIMESTAMP",
        params![
            client.id,
            client.name,
            client.phone,
            client.address,
            client.loan_amount.to_string(),
            client.daily_payment.to_string(),
            client.balance.to_string(),
            client.start_date.map(|d| d.to_string()),
            client.status.as_str(),
        ],
    )
}

fn write_transaction(conn: &Connection, tx: &Transaction) -> duckdb::Result<usize> {
    conn.execute(
        "INSERT INTO sys_transactions (transaction_id, client_id, client_name, amount,
                                       transaction_date, status, notes, is_new_loan)
         VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), ?, ?, ?)
         ON CONFLICT (transaction_id) DO UPDATE SET
            client_id = EXCLUDED.client_id,
            client_name = EXCLUDED.client_name,
            amount = EXCLUDED.amount,
            transaction_date = EXCLUDED.transaction_date,
            status = EXCLUDED.status,
            notes = EXCLUDED.notes,
            is_new_loan = EXCLUDED.is_new_loan,
            updated_at = CURRENT_TIMESTAMP",
        params![
            tx.id,
            tx.client_id,
            tx.client_name,
            tx.amount.map(|a| a.to_string()),
            tx.date.map(|d| d.to_string()),
            tx.status,
            tx.notes,
            tx.is_new_loan,
        ],
    )
}

fn row_to_client(row: &duckdb::Row) -> Client {
    // Column order follows CLIENT_COLUMNS
    let loan_amount: Option<String> = row.get(4).ok();
    let daily_payment: Option<String> = row.get(5).ok();
    let balance: Option<String> = row.get(6).ok();
    let start_date: Option<String> = row.get(7).ok();
    let status: Option<String> = row.get(8).ok();

    Client {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        phone: row.get(2).ok(),
        address: row.get(3).ok(),
        loan_amount: loan_amount.as_deref().and_then(parse_decimal).unwrap_or_default(),
        daily_payment: daily_payment.as_deref().and_then(parse_decimal).unwrap_or_default(),
        balance: balance.as_deref().and_then(parse_decimal).unwrap_or_default(),
        start_date: start_date.as_deref().and_then(parse_date),
        status: status.as_deref().map(ClientStatus::parse).unwrap_or_default(),
    }
}

fn row_to_transaction(row: &duckdb::Row) -> Transaction {
    // Column order follows TRANSACTION_COLUMNS
    let amount: Option<String> = row.get(3).ok();
    let date: Option<String> = row.get(4).ok();

    Transaction {
        id: row.get(0).unwrap_or_default(),
        client_id: row.get(1).ok(),
        client_name: row.get(2).ok(),
        amount: amount.as_deref().and_then(parse_decimal),
        date: date.as_deref().and_then(parse_date),
        status: row.get(5).ok(),
        notes: row.get(6).ok(),
        is_new_loan: row
            .get::<_, Option<bool>>(7)
            .ok()
            .flatten()
            .unwrap_or(false),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("Database is locked"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("syntax error"));
    }

    #[test]
    fn test_client_round_trip_keeps_status_and_amounts() {
        let repo = repo();
        let mut client = Client::new("c1", "Amina", Decimal::new(15000050, 2), Decimal::new(5000, 0), date(1));
        client.status = ClientStatus::Other("Written Off".to_string());
        client.phone = Some("+255700000001".to_string());
        repo.upsert_client(&client).unwrap();

        let stored = repo.get_client_by_id("c1").unwrap().unwrap();
        assert_eq!(stored.loan_amount, Decimal::new(15000050, 2));
        assert_eq!(stored.daily_payment, Decimal::new(5000, 0));
        assert_eq!(stored.start_date, Some(date(1)));
        assert_eq!(stored.status, ClientStatus::Other("Written Off".to_string()));
        assert_eq!(stored.phone.as_deref(), Some("+255700000001"));
        assert!(repo.get_client_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_transaction_with_missing_fields_round_trips() {
        let repo = repo();
        let tx = Transaction {
            id: "t1".to_string(),
            ..Transaction::default()
        };
        repo.upsert_transaction(&tx).unwrap();

        let stored = repo.get_transactions().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].amount.is_none());
        assert!(stored[0].date.is_none());
        assert!(stored[0].client_id.is_none());
        assert!(!stored[0].is_new_loan);
    }

    #[test]
    fn test_transactions_between_is_inclusive() {
        let repo = repo();
        for (id, day) in [("t1", 3), ("t2", 4), ("t3", 10), ("t4", 11)] {
            repo.upsert_transaction(&Transaction::new(id, "c1", Decimal::new(5000, 0), date(day)))
                .unwrap();
        }

        let found = repo.get_transactions_between(date(4), date(10)).unwrap();
        let ids: Vec<_> = found.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);

        let range = repo.get_transaction_date_range().unwrap();
        assert_eq!(range.earliest, Some(date(3)));
        assert_eq!(range.latest, Some(date(11)));
    }

    #[test]
    fn test_batch_upsert_is_all_or_nothing() {
        let repo = repo();
        let good = Transaction::new("t1", "c1", Decimal::new(5000, 0), date(10));
        let too_large = Transaction::new("t2", "c1", Decimal::MAX, date(10));

        assert!(repo.upsert_transactions(&[good.clone(), too_large]).is_err());
        assert_eq!(repo.get_transaction_count().unwrap(), 0);

        repo.upsert_transactions(&[good]).unwrap();
        assert_eq!(repo.get_transaction_count().unwrap(), 1);

        let mut whale = Client::new("c1", "Amina", Decimal::new(1000, 0), Decimal::new(50, 0), date(1));
        let ok = whale.clone();
        whale.id = "c2".to_string();
        whale.loan_amount = Decimal::MAX;
        assert!(repo.upsert_clients(&[ok.clone(), whale]).is_err());
        assert_eq!(repo.get_client_count().unwrap(), 0);
        repo.upsert_clients(&[ok]).unwrap();
        assert_eq!(repo.get_client_count().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_reads_clients_and_windowed_transactions() {
        let repo = repo();
        repo.upsert_client(&Client::new("c1", "Amina", Decimal::new(1000, 0), Decimal::new(50, 0), date(1)))
            .unwrap();
        repo.upsert_transactions(&[
            Transaction::new("t1", "c1", Decimal::new(50, 0), date(2)),
            Transaction::new("t2", "c1", Decimal::new(50, 0), date(9)),
        ])
        .unwrap();

        let (clients, transactions) = repo.snapshot_between(date(5), date(10)).unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].id, "t2");
    }

    #[test]
    fn test_blank_status_stays_inactive() {
        let repo = repo();
        let mut client = Client::new("c1", "Amina", Decimal::new(1000, 0), Decimal::new(50, 0), date(1));
        client.status = ClientStatus::default();
        repo.upsert_client(&client).unwrap();

        let stored = repo.get_client_by_id("c1").unwrap().unwrap();
        assert_eq!(stored.status, ClientStatus::Other(String::new()));
        assert!(!stored.is_active_on(date(10)));
    }

    #[test]
    fn test_delete_client_removes_transactions() {
        let repo = repo();
        repo.upsert_client(&Client::new("c1", "Amina", Decimal::new(1000, 0), Decimal::new(50, 0), date(1)))
            .unwrap();
        repo.upsert_transaction(&Transaction::new("t1", "c1", Decimal::new(50, 0), date(2)))
            .unwrap();
        repo.upsert_transaction(&Transaction::new("t2", "c2", Decimal::new(50, 0), date(2)))
            .unwrap();

        assert!(repo.delete_client("c1").unwrap());
        assert_eq!(repo.get_client_count().unwrap(), 0);
        assert_eq!(repo.get_transaction_count().unwrap(), 1);
        assert!(!repo.delete_client("c1").unwrap());
    }
}
