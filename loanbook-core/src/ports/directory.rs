//! Client directory and transaction ledger ports

use anyhow::Result;
use chrono::NaiveDate;

use crate::domain::{Client, Transaction};

/// Supplies the client roster
pub trait ClientDirectory: Send + Sync {
    /// All clients, in any order
    fn clients(&self) -> Result<Vec<Client>>;
}

/// Supplies recorded transactions
pub trait TransactionLedger: Send + Sync {
    /// All transactions, in any order
    fn transactions(&self) -> Result<Vec<Transaction>>;

    /// Transactions dated within `[start, end]`.
    ///
    /// Transactions without a date can never fall inside a window, so
    /// implementations are free to leave them out.
    fn transactions_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions()?
            .into_iter()
            .filter(|tx| tx.date.map_or(false, |d| d >= start && d <= end))
            .collect())
    }
}

/// A client directory and transaction ledger that can be read together
pub trait LoanBook: ClientDirectory + TransactionLedger {
    /// All clients plus the transactions dated within `[start, end]`.
    ///
    /// Implementations backed by shared mutable storage override this so
    /// that both halves come from the same state.
    fn snapshot_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Client>, Vec<Transaction>)> {
        Ok((self.clients()?, self.transactions_between(start, end)?))
    }
}

/// An in-memory snapshot of both collaborators
#[derive(Debug, Clone, Default)]
pub struct InMemoryBook {
    pub clients: Vec<Client>,
    pub transactions: Vec<Transaction>,
}

impl InMemoryBook {
    pub fn new(clients: Vec<Client>, transactions: Vec<Transaction>) -> Self {
        Self { clients, transactions }
    }
}

impl ClientDirectory for InMemoryBook {
    fn clients(&self) -> Result<Vec<Client>> {
        Ok(self.clients.clone())
    }
}

impl TransactionLedger for InMemoryBook {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }
}

impl LoanBook for InMemoryBook {}
