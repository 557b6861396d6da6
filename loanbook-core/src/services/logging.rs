//! Event log - privacy-safe application events in logs.duckdb
//!
//! Only event names, command names, window sizes and error text are
//! stored. Client names, phone numbers and amounts never are.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Low 16 bits of every entry id; disambiguates entries in the same millisecond
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_entry_id(timestamp_ms: i64) -> u64 {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((timestamp_ms.max(0) as u64) << 16) | sequence
}

/// Which surface produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
}

impl EntryPoint {
    fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
        }
    }
}

/// An event waiting to be written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn with_command(self, command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..self
        }
    }

    /// Size of the window a report covered
    pub fn with_window_days(self, days: u32) -> Self {
        Self {
            window_days: Some(days),
            ..self
        }
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..self
        }
    }

    pub fn with_error_details(self, details: impl Into<String>) -> Self {
        Self {
            error_details: Some(details.into()),
            ..self
        }
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub window_days: Option<u32>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            platform: row.get(4)?,
            event: row.get(5)?,
            command: row.get(6)?,
            window_days: row.get(7)?,
            error_message: row.get(8)?,
            error_details: row.get(9)?,
        })
    }
}

const SELECT_ENTRIES: &str = "SELECT id, timestamp, entry_point, app_version, platform, event,
    command, window_days, error_message, error_details FROM sys_logs";

/// Writes and queries the event log
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open logs.duckdb in `data_dir`, creating and migrating it as needed
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event stamped with entry point, version and OS
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();
        self.lock()?.execute(
            "INSERT INTO sys_logs (id, timestamp, entry_point, app_version, platform, event,
                                   command, window_days, error_message, error_details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                next_entry_id(timestamp),
                timestamp,
                self.entry_point.as_str(),
                self.app_version,
                std::env::consts::OS,
                event.event,
                event.command,
                event.window_days,
                event.error_message,
                event.error_details,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let event = LogEvent::new(event).with_error(message);
        self.log(match details {
            Some(d) => event.with_error_details(d),
            None => event,
        })
    }

    /// Newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select(&format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?", SELECT_ENTRIES), limit)
    }

    /// Newest first, only entries with an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select(
            &format!(
                "{} WHERE error_message IS NOT NULL ORDER BY timestamp DESC, id DESC LIMIT ?",
                SELECT_ENTRIES
            ),
            limit,
        )
    }

    fn select(&self, sql: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map([limit as i64], LogEntry::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn count_errors(&self) -> Result<u64> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_message IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Delete entries older than `timestamp_ms`; returns how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let deleted = self
            .lock()?
            .execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
