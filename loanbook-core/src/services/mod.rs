//! Service layer
//!
//! The reconciliation pipeline (`classifier` → `aggregator` → `streaks`) is
//! pure and synchronous. The remaining services wire it to storage, import
//! and event logging.

pub mod aggregator;
pub mod classifier;
mod collection;
pub mod import;
pub mod logging;
pub mod migration;
mod status;
pub mod streaks;

pub use aggregator::{build_daily_summaries, build_daily_summaries_with_observer};
pub use classifier::{
    classify, is_qualifying_collection, ClassificationObserver, NoopObserver, TracingObserver,
};
pub use collection::CollectionService;
pub use import::{ClientColumns, ImportResult, ImportService, TransactionColumns};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{StatusService, StatusSummary};
pub use streaks::find_missed_streaks;
