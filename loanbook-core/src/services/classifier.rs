//! Collection classifier - decides whether a transaction is a genuine
//! daily collection or noise (disbursements, unpaid markers)
//!
//! The amount heuristics can mistake a large catch-up payment for a
//! disbursement and exclude it.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::{Classification, Client, ExclusionReason, Transaction};

/// Note markers that identify a disbursement (matched case-insensitively)
pub const DISBURSEMENT_MARKERS: [&str; 4] =
    ["DISBURSED", "NEW LOAN", "LOAN DISBURSEMENT", "DISBURSEMENT"];

fn disbursement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives = DISBURSEMENT_MARKERS
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i){}", alternatives)).expect("disbursement markers are valid regex")
    })
}

/// True if the notes mention any disbursement marker
pub fn notes_indicate_disbursement(notes: &str) -> bool {
    !notes.is_empty() && disbursement_regex().is_match(notes)
}

/// Classify a transaction against its owning client.
///
/// Rules are checked in a fixed order and the first match is reported.
/// Never fails: missing fields simply do not trigger the rule that reads them.
pub fn classify(tx: &Transaction, client: Option<&Client>) -> Classification {
    let Some(client) = client else {
        return Classification::Excluded(ExclusionReason::UnknownClient);
    };
    let Some(amount) = tx.amount else {
        return Classification::Excluded(ExclusionReason::MissingAmount);
    };

    if tx.is_new_loan {
        return Classification::Excluded(ExclusionReason::NewLoanFlag);
    }
    if notes_indicate_disbursement(tx.notes_text()) {
        return Classification::Excluded(ExclusionReason::DisbursementNotes);
    }
    if tx.is_unpaid_marker() {
        return Classification::Excluded(ExclusionReason::UnpaidMarker);
    }
    if amount == client.loan_amount {
        return Classification::Excluded(ExclusionReason::EqualsLoanAmount);
    }
    // A cap too large to represent excludes nothing
    let cap = client.daily_payment.checked_mul(Decimal::TWO);
    if cap.map_or(false, |cap| amount > cap) {
        return Classification::Excluded(ExclusionReason::ExceedsDailyCap);
    }

    Classification::Qualifying
}

/// True if the transaction counts as a collection for `client`
pub fn is_qualifying_collection(tx: &Transaction, client: Option<&Client>) -> bool {
    classify(tx, client).is_qualifying()
}

/// Hook invoked once per classified transaction
pub trait ClassificationObserver {
    fn on_classified(&self, tx: &Transaction, outcome: &Classification);
}

impl<F> ClassificationObserver for F
where
    F: Fn(&Transaction, &Classification),
{
    fn on_classified(&self, tx: &Transaction, outcome: &Classification) {
        self(tx, outcome)
    }
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ClassificationObserver for NoopObserver {
    fn on_classified(&self, _tx: &Transaction, _outcome: &Classification) {}
}

/// Observer that emits a `tracing` debug event per classification
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ClassificationObserver for TracingObserver {
    fn on_classified(&self, tx: &Transaction, outcome: &Classification) {
        tracing::debug!(
            transaction_id = %tx.id,
            client_id = tx.client_ref().unwrap_or("-"),
            date = ?tx.date,
            qualifying = outcome.is_qualifying(),
            reason = outcome.reason().map(|r| r.as_str()).unwrap_or("-"),
            "classified transaction"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn client() -> Client {
        Client::new(
            "c1",
            "Amina",
            Decimal::new(150000, 0),
            Decimal::new(5000, 0),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn payment(amount: i64) -> Transaction {
        Transaction::new("t1", "c1", Decimal::new(amount, 0), date())
    }

    #[test]
    fn test_regular_payment_qualifies() {
        assert_eq!(classify(&payment(5000), Some(&client())), Classification::Qualifying);
        assert!(is_qualifying_collection(&payment(5000).with_notes(""), Some(&client())));
    }

    #[test]
    fn test_unknown_client_never_qualifies() {
        assert_eq!(
            classify(&payment(5000), None),
            Classification::Excluded(ExclusionReason::UnknownClient)
        );
    }

    #[test]
    fn test_missing_amount_never_qualifies() {
        let mut tx = payment(5000);
        tx.amount = None;
        assert_eq!(
            classify(&tx, Some(&client())),
            Classification::Excluded(ExclusionReason::MissingAmount)
        );
    }

    #[test]
    fn test_new_loan_flag_excludes() {
        assert_eq!(
            classify(&payment(5000).as_new_loan(), Some(&client())),
            Classification::Excluded(ExclusionReason::NewLoanFlag)
        );
    }

    #[test]
    fn test_disbursement_notes_exclude_case_insensitively() {
        for notes in ["Loan disbursed today", "new loan", "Loan Disbursement #4", "disbursement"] {
            let tx = payment(5000).with_notes(notes);
            assert_eq!(
                classify(&tx, Some(&client())),
                Classification::Excluded(ExclusionReason::DisbursementNotes),
                "notes {:?} should exclude",
                notes
            );
        }
        assert!(is_qualifying_collection(&payment(5000).with_notes("paid at market"), Some(&client())));
    }

    #[test]
    fn test_unpaid_status_excludes() {
        assert_eq!(
            classify(&payment(5000).with_status("Unpaid"), Some(&client())),
            Classification::Excluded(ExclusionReason::UnpaidMarker)
        );
    }

    #[test]
    fn test_full_principal_is_a_disbursement() {
        assert_eq!(
            classify(&payment(150000), Some(&client())),
            Classification::Excluded(ExclusionReason::EqualsLoanAmount)
        );
    }

    #[test]
    fn test_daily_cap_boundary() {
        assert!(is_qualifying_collection(&payment(10000), Some(&client())));
        assert_eq!(
            classify(&payment(10001), Some(&client())),
            Classification::Excluded(ExclusionReason::ExceedsDailyCap)
        );
    }

    #[test]
    fn test_huge_daily_payment_does_not_overflow_cap() {
        let mut whale = client();
        whale.daily_payment = Decimal::MAX;
        assert_eq!(classify(&payment(5), Some(&whale)), Classification::Qualifying);

        let big = Transaction::new("t2", "c1", Decimal::MAX, date());
        assert_eq!(classify(&big, Some(&whale)), Classification::Qualifying);
    }

    #[test]
    fn test_closure_observer_sees_every_outcome() {
        let seen = RefCell::new(Vec::new());
        let observer = |tx: &Transaction, outcome: &Classification| {
            seen.borrow_mut().push((tx.id.clone(), *outcome));
        };
        let tx = payment(5000);
        observer.on_classified(&tx, &classify(&tx, Some(&client())));
        assert_eq!(seen.into_inner(), vec![("t1".to_string(), Classification::Qualifying)]);
    }
}
