//! Outcome of classifying a single transaction

use std::fmt;

use serde::Serialize;

/// Why a transaction does not count as a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No client in the roster matches the transaction's client id
    UnknownClient,
    /// Amount is missing, so nothing can be collected
    MissingAmount,
    /// Disbursement flag is set
    NewLoanFlag,
    /// Notes mention a disbursement
    DisbursementNotes,
    /// Status is the explicit "Unpaid" marker
    UnpaidMarker,
    /// Amount equals the full principal
    EqualsLoanAmount,
    /// Amount is more than twice the daily payment
    ExceedsDailyCap,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownClient => "unknown_client",
            Self::MissingAmount => "missing_amount",
            Self::NewLoanFlag => "new_loan_flag",
            Self::DisbursementNotes => "disbursement_notes",
            Self::UnpaidMarker => "unpaid_marker",
            Self::EqualsLoanAmount => "equals_loan_amount",
            Self::ExceedsDailyCap => "exceeds_daily_cap",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running the collection classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Classification {
    Qualifying,
    Excluded(ExclusionReason),
}

impl Classification {
    pub fn is_qualifying(&self) -> bool {
        matches!(self, Self::Qualifying)
    }

    pub fn reason(&self) -> Option<ExclusionReason> {
        match self {
            Self::Qualifying => None,
            Self::Excluded(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualifying => f.write_str("qualifying"),
            Self::Excluded(reason) => write!(f, "excluded ({})", reason),
        }
    }
}
