//! Client (loan account) domain model

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::result::{self, Error};

/// Lifecycle state of a loan account.
///
/// The set of terminal states is owned by the client directory, so anything
/// that is not one of the known variants is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientStatus {
    Active,
    Completed,
    Defaulted,
    Other(String),
}

impl ClientStatus {
    /// Parse a free-form status string (known variants are case-insensitive)
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            "defaulted" => Self::Defaulted,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Defaulted => "Defaulted",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A record without a status is malformed and is never treated as active
impl Default for ClientStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ClientStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClientStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// A borrower's loan account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Principal disbursed
    pub loan_amount: Decimal,
    /// Expected collection per day
    pub daily_payment: Decimal,
    /// Outstanding balance
    #[serde(default)]
    pub balance: Decimal,
    /// Loan start date; a client without one is never active
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ClientStatus,
}

impl Client {
    /// Create an active client with the required loan terms
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        loan_amount: Decimal,
        daily_payment: Decimal,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
            address: None,
            loan_amount,
            daily_payment,
            balance: loan_amount,
            start_date: Some(start_date),
            status: ClientStatus::Active,
        }
    }

    /// Active on `day` iff status is Active and the loan started on or before `day`
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.status.is_active() && self.start_date.map_or(false, |start| start <= day)
    }

    /// Validate client data
    pub fn validate(&self) -> result::Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("client id cannot be empty"));
        }
        if self.loan_amount < Decimal::ZERO {
            return Err(Error::validation("loan amount cannot be negative"));
        }
        if self.daily_payment < Decimal::ZERO {
            return Err(Error::validation("daily payment cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ClientStatus::parse("active"), ClientStatus::Active);
        assert_eq!(ClientStatus::parse(" COMPLETED "), ClientStatus::Completed);
        assert_eq!(ClientStatus::parse("Defaulted"), ClientStatus::Defaulted);
        assert_eq!(
            ClientStatus::parse("Written Off"),
            ClientStatus::Other("Written Off".to_string())
        );
    }

    #[test]
    fn test_missing_status_is_not_active() {
        assert!(!ClientStatus::default().is_active());

        let json = r#"{"id":"c1","name":"Amina","loanAmount":"1000","dailyPayment":"50","startDate":"2024-01-01"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.status, ClientStatus::Other(String::new()));
        assert!(!client.is_active_on(date(2024, 6, 1)));
    }

    #[test]
    fn test_active_on_respects_start_date() {
        let client = Client::new("c1", "Amina", Decimal::new(150000, 0), Decimal::new(5000, 0), date(2024, 6, 10));
        assert!(!client.is_active_on(date(2024, 6, 9)));
        assert!(client.is_active_on(date(2024, 6, 10)));
        assert!(client.is_active_on(date(2024, 6, 11)));
    }

    #[test]
    fn test_inactive_statuses() {
        let mut client = Client::new("c1", "Amina", Decimal::new(150000, 0), Decimal::new(5000, 0), date(2024, 1, 1));
        client.status = ClientStatus::Completed;
        assert!(!client.is_active_on(date(2024, 6, 10)));

        client.status = ClientStatus::Active;
        client.start_date = None;
        assert!(!client.is_active_on(date(2024, 6, 10)));
    }

    #[test]
    fn test_client_validation() {
        let mut client = Client::new("c1", "Amina", Decimal::new(150000, 0), Decimal::new(5000, 0), date(2024, 1, 1));
        assert!(client.validate().is_ok());

        client.daily_payment = Decimal::new(-1, 0);
        assert!(client.validate().is_err());

        client.daily_payment = Decimal::ZERO;
        client.id = " ".to_string();
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_status_serde_is_free_form() {
        let json = r#"{"id":"c1","name":"Amina","loanAmount":"1000","dailyPayment":"50","status":"paused"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.status, ClientStatus::Other("paused".to_string()));
        assert!(client.start_date.is_none());
        assert_eq!(serde_json::to_value(&client.status).unwrap(), "paused");
    }
}
