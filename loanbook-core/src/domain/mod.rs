//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod client;
mod transaction;
pub mod classification;
pub mod summary;
pub mod window;
pub mod result;

pub use client::{Client, ClientStatus};
pub use transaction::{Transaction, UNPAID_STATUS};
pub use classification::{Classification, ExclusionReason};
pub use summary::{CollectionReport, DaySummary, MissedStreak, PaidClient, UnpaidClient, WindowTotals};
pub use window::Window;
