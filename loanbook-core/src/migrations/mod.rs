//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str! and applied
//! in the order listed.

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// New migrations go in a new NNN_description.sql file and are appended here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
