//! Collection service - runs the reconciliation pipeline over the client
//! directory and transaction ledger

use std::sync::Arc;

use anyhow::Result;

use super::aggregator::summarize_window;
use super::classifier::{ClassificationObserver, NoopObserver, TracingObserver};
use super::streaks::find_missed_streaks;
use crate::domain::{Client, CollectionReport, DaySummary, MissedStreak, Transaction, Window, WindowTotals};
use crate::ports::LoanBook;

/// Collection service for day-by-day reconciliation
///
/// Each call takes a fresh snapshot of clients and transactions from the
/// book, so edits made while a report is being built are not seen.
pub struct CollectionService<B: ?Sized> {
    book: Arc<B>,
    trace_classification: bool,
}

impl<B> CollectionService<B>
where
    B: LoanBook + ?Sized,
{
    pub fn new(book: Arc<B>) -> Self {
        Self {
            book,
            trace_classification: false,
        }
    }

    /// Emit a tracing event for every classified transaction
    pub fn with_classification_tracing(mut self, enabled: bool) -> Self {
        self.set_classification_tracing(enabled);
        self
    }

    pub fn set_classification_tracing(&mut self, enabled: bool) {
        self.trace_classification = enabled;
    }

    pub fn traces_classification(&self) -> bool {
        self.trace_classification
    }

    /// Day summaries for the window, oldest first
    pub fn daily_summaries(&self, window: &Window) -> Result<Vec<DaySummary>> {
        let (clients, transactions) = self.snapshot(window)?;
        Ok(summarize_window(&clients, &transactions, window, self.observer()))
    }

    /// Current missed-payment streaks within the window, longest first
    pub fn missed_streaks(&self, window: &Window) -> Result<Vec<MissedStreak>> {
        let (clients, transactions) = self.snapshot(window)?;
        let days = summarize_window(&clients, &transactions, window, self.observer());
        Ok(find_missed_streaks(&clients, &days))
    }

    /// Full report: day summaries, streaks and window totals
    pub fn build_report(&self, window: &Window) -> Result<CollectionReport> {
        self.build_report_with_observer(window, self.observer())
    }

    /// Full report, reporting each classification to `observer`
    pub fn build_report_with_observer(
        &self,
        window: &Window,
        observer: &dyn ClassificationObserver,
    ) -> Result<CollectionReport> {
        let (clients, transactions) = self.snapshot(window)?;
        let days = summarize_window(&clients, &transactions, window, observer);
        let streaks = find_missed_streaks(&clients, &days);
        let totals = WindowTotals::from_days(&days);

        tracing::debug!(
            reference_date = %window.reference_date,
            window_days = window.days,
            clients = clients.len(),
            transactions = transactions.len(),
            streaks = streaks.len(),
            "built collection report"
        );

        Ok(CollectionReport {
            reference_date: window.reference_date,
            window_days: window.days,
            days,
            streaks,
            totals,
        })
    }

    fn observer(&self) -> &'static dyn ClassificationObserver {
        if self.trace_classification {
            &TracingObserver
        } else {
            &NoopObserver
        }
    }

    fn snapshot(&self, window: &Window) -> Result<(Vec<Client>, Vec<Transaction>)> {
        self.book
            .snapshot_between(window.start_date(), window.reference_date)
    }
}
