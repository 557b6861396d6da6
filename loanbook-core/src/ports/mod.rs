//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The
//! reconciliation services depend only on these traits, not on concrete
//! storage.

mod directory;

pub use directory::{ClientDirectory, InMemoryBook, LoanBook, TransactionLedger};
