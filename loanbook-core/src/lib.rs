//! Loanbook Core - daily collection reconciliation for microfinance loan books
//!
//! Given client loan records and payment transactions, works out per
//! calendar day which active clients paid, which did not, how much was
//! collected, and which clients are on a run of missed payments.
//!
//! - **domain**: Clients, transactions and the derived day summaries
//! - **ports**: Client directory and transaction ledger traits
//! - **services**: The classify → aggregate → streak pipeline, plus import and logging
//! - **adapters**: DuckDB storage

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{CollectionService, ImportService, StatusService};

// Re-export commonly used types at crate root
pub use domain::{
    Classification, Client, ClientStatus, CollectionReport, DaySummary, ExclusionReason,
    MissedStreak, PaidClient, Transaction, UnpaidClient, Window, WindowTotals,
};
pub use domain::result::{Error, Result as CoreResult};
pub use services::{
    build_daily_summaries, find_missed_streaks, is_qualifying_collection, EntryPoint, LogEvent,
    LoggingService,
};

/// Main context for loan book operations
///
/// Holds the configuration, the database and every service wired to it.
pub struct LoanbookContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub collection_service: CollectionService<DuckDbRepository>,
    pub import_service: ImportService,
    pub status_service: StatusService,
}

impl LoanbookContext {
    /// Open the loan book in `data_dir`, creating the database if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join("loanbook.duckdb"))?);
        repository.ensure_schema()?;

        let collection_service = CollectionService::new(Arc::clone(&repository))
            .with_classification_tracing(config.trace_classification);
        let import_service = ImportService::new(Arc::clone(&repository))
            .with_date_formats(config.import.date_formats.clone());
        let status_service = StatusService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            collection_service,
            import_service,
            status_service,
        })
    }
}
