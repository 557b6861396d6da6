//! Migration service - applies embedded SQL migrations in order
//!
//! Applied names are recorded in sys_migrations, created by the first
//! migration of every set, so a second run applies nothing.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// An embedded migration set: (file name, SQL), in apply order
pub type MigrationSet = &'static [(&'static str, &'static str)];

/// Outcome of a migration run
#[derive(Debug)]
pub struct MigrationResult {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations found already recorded
    pub already_applied: usize,
}

/// Applies a migration set to one connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: MigrationSet,
}

impl<'a> MigrationService<'a> {
    /// Loan book schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: MigrationSet) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let recorded = if self.has_migrations_table()? {
            self.get_applied()?
        } else {
            Vec::new()
        };

        let mut applied = Vec::new();
        for (name, sql) in self.migrations {
            if recorded.iter().any(|r| r.as_str() == *name) {
                continue;
            }
            self.conn
                .execute_batch(sql)
                .with_context(|| format!("Migration {} failed", name))?;
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [*name])?;
            tracing::debug!(migration = %name, "applied migration");
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied: recorded.len(),
        })
    }

    fn has_migrations_table(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Names from this set that have not been recorded yet
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = if self.has_migrations_table()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.already_applied, 0);

        let again = service.run_pending().unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_get_pending_after_bootstrap() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [MIGRATIONS[0].0],
        )
        .unwrap();

        let pending = MigrationService::new(&conn).get_pending().unwrap();
        assert_eq!(pending.len(), MIGRATIONS.len() - 1);
    }

    #[test]
    fn test_everything_pending_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        let pending = MigrationService::new(&conn).get_pending().unwrap();
        assert_eq!(pending.len(), MIGRATIONS.len());
    }

    #[test]
    fn test_log_migration_set() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);
        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());
        assert!(service.get_pending().unwrap().is_empty());
    }
}
