//! CLI command implementations

pub mod clients;
pub mod config;
pub mod daily;
pub mod import;
pub mod logs;
pub mod report;
pub mod status;
pub mod streaks;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use loanbook_core::{EntryPoint, LogEvent, LoggingService, LoanbookContext, Window};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let loanbook_dir = get_loanbook_dir().ok()?;
    std::fs::create_dir_all(&loanbook_dir).ok()?;
    LoggingService::new(&loanbook_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the loanbook directory from environment or default
pub fn get_loanbook_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LOANBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".loanbook"))
        .context("Could not find home directory; set LOANBOOK_DIR")
}

/// Get or create loanbook context
pub fn get_context() -> Result<LoanbookContext> {
    let loanbook_dir = get_loanbook_dir()?;

    std::fs::create_dir_all(&loanbook_dir)
        .with_context(|| format!("Failed to create loanbook directory: {:?}", loanbook_dir))?;

    LoanbookContext::new(&loanbook_dir).context("Failed to initialize loanbook context")
}

/// Context for the report commands; `verbose` traces every classification
pub fn get_report_context(verbose: bool) -> Result<LoanbookContext> {
    let mut ctx = get_context()?;
    if verbose {
        ctx.collection_service.set_classification_tracing(true);
    }
    Ok(ctx)
}

/// Resolve the window for a report command, logging configuration errors
pub fn resolve_window(
    ctx: &LoanbookContext,
    logger: &Option<LoggingService>,
    command: &str,
    days: Option<i64>,
    date: Option<NaiveDate>,
) -> Result<Window> {
    ctx.config.resolve_window(days, date).map_err(|e| {
        log_event(
            logger,
            LogEvent::new("invalid_window")
                .with_command(command)
                .with_error(e.to_string()),
        );
        e.into()
    })
}

/// Record that a report was built for `window`
pub fn log_report(logger: &Option<LoggingService>, command: &str, window: &Window) {
    log_event(
        logger,
        LogEvent::new("report_built")
            .with_command(command)
            .with_window_days(window.days),
    );
}
