//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the client directory and transaction ledger

pub mod duckdb;
