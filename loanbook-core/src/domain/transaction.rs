//! Transaction domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status text the ledger uses to record an explicit non-collection
pub const UNPAID_STATUS: &str = "Unpaid";

/// A recorded monetary event tied to a client.
///
/// The ledger is not trusted to be well formed: every field the
/// reconciliation reads is optional, and `is_new_loan` defaults to false.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Denormalized display name
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free-form status, e.g. "Paid" or "Unpaid"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Marks a new-loan disbursement
    #[serde(default)]
    pub is_new_loan: bool,
}

impl Transaction {
    /// Create a paid transaction with required fields
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: Some(client_id.into()),
            client_name: None,
            amount: Some(amount),
            date: Some(date),
            status: Some("Paid".to_string()),
            notes: None,
            is_new_loan: false,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn as_new_loan(mut self) -> Self {
        self.is_new_loan = true;
        self
    }

    /// True if the status explicitly records a missed payment
    pub fn is_unpaid_marker(&self) -> bool {
        self.status
            .as_deref()
            .map_or(false, |s| s.trim() == UNPAID_STATUS)
    }

    /// Notes text, empty when absent
    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or("")
    }

    /// Client id, treating blank ids as missing
    pub fn client_ref(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
