//! Concurrent access tests
//!
//! Reports are built from several threads over one shared repository while
//! another thread keeps writing transactions. Each report works on its own
//! snapshot, so every one of them must still be internally consistent.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tempfile::TempDir;

use loanbook_core::adapters::duckdb::DuckDbRepository;
use loanbook_core::domain::{Client, Transaction, Window};
use loanbook_core::ports::LoanBook;
use loanbook_core::services::CollectionService;

/// Reader threads building reports
const READER_COUNT: usize = 4;

/// Reports built per reader
const REPORTS_PER_READER: usize = 5;

/// Transactions appended by the writer
const WRITES: usize = 40;

const CLIENT_COUNT: usize = 10;

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn seed(repo: &DuckDbRepository) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for i in 0..CLIENT_COUNT {
        let client = Client::new(
            format!("c{:02}", i),
            format!("Client {}", i),
            Decimal::new(100000, 0),
            Decimal::new(2000 + 500 * i as i64, 0),
            start,
        );
        repo.upsert_client(&client).unwrap();
    }
}

#[test]
fn test_reports_stay_consistent_during_writes() {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(DuckDbRepository::new(&temp_dir.path().join("concurrent.duckdb")).unwrap());
    repo.ensure_schema().unwrap();
    seed(&repo);

    let service = Arc::new(CollectionService::new(Arc::clone(&repo)));
    let window = Window::new(14, reference_date()).unwrap();
    let barrier = Arc::new(Barrier::new(READER_COUNT + 1));
    let reports_built = Arc::new(AtomicUsize::new(0));

    let writer = {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..WRITES {
                let date = reference_date()
                    .checked_sub_days(Days::new((i % 14) as u64))
                    .unwrap();
                let tx = Transaction::new(
                    format!("w{}", i),
                    format!("c{:02}", i % CLIENT_COUNT),
                    Decimal::new(2000, 0),
                    date,
                );
                repo.upsert_transaction(&tx).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READER_COUNT)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let reports_built = Arc::clone(&reports_built);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..REPORTS_PER_READER {
                    let report = service.build_report(&window).unwrap();
                    assert_eq!(report.days.len(), 14);

                    for day in &report.days {
                        let paid: HashSet<_> =
                            day.paid_clients.iter().map(|p| p.client_id.clone()).collect();
                        let unpaid: HashSet<_> =
                            day.unpaid_clients.iter().map(|u| u.client_id.clone()).collect();
                        assert!(paid.is_disjoint(&unpaid));
                        assert_eq!(paid.len() + unpaid.len(), CLIENT_COUNT);

                        let paid_sum: Decimal =
                            day.paid_clients.iter().map(|p| p.actual_amount_paid).sum();
                        assert_eq!(day.total_collected, paid_sum);
                    }
                    reports_built.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }

    assert_eq!(reports_built.load(Ordering::SeqCst), READER_COUNT * REPORTS_PER_READER);
    assert_eq!(repo.get_transaction_count().unwrap(), WRITES as i64);

    // Once writes settle, every client has paid on the days it was written for
    let report = service.build_report(&window).unwrap();
    let paid_days: usize = report.days.iter().map(|d| d.paid_clients.len()).sum();
    assert_eq!(paid_days, WRITES);
}

#[test]
fn test_snapshot_never_sees_a_transaction_before_its_client() {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(DuckDbRepository::new(&temp_dir.path().join("snapshot.duckdb")).unwrap());
    repo.ensure_schema().unwrap();

    let window = Window::new(14, reference_date()).unwrap();
    let barrier = Arc::new(Barrier::new(READER_COUNT + 1));

    // Each new client is stored before its first payment
    let writer = {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..WRITES {
                let id = format!("n{:03}", i);
                repo.upsert_client(&Client::new(
                    id.as_str(),
                    "New client",
                    Decimal::new(100000, 0),
                    Decimal::new(2000, 0),
                    reference_date(),
                ))
                .unwrap();
                repo.upsert_transaction(&Transaction::new(
                    format!("p{}", i),
                    id,
                    Decimal::new(2000, 0),
                    reference_date(),
                ))
                .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READER_COUNT)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..WRITES {
                    let (clients, transactions) = repo
                        .snapshot_between(window.start_date(), window.reference_date)
                        .unwrap();
                    let known: HashSet<_> = clients.iter().map(|c| c.id.as_str()).collect();
                    assert!(transactions
                        .iter()
                        .all(|tx| tx.client_ref().map_or(false, |id| known.contains(id))));
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(repo.get_client_count().unwrap(), WRITES as i64);
}
