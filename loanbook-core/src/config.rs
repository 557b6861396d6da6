//! Configuration management
//!
//! Settings live in `<loanbook_dir>/settings.json`:
//! ```json
//! {
//!   "app": { "defaultWindowDays": 7, "referenceDate": null, "traceClassification": false },
//!   "import": { "dateFormats": ["%Y-%m-%d"] }
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::result::Result as CoreResult;
use crate::domain::Window;

/// Window size used when neither the caller nor settings choose one
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    default_window_days: Option<u32>,
    #[serde(default)]
    reference_date: Option<NaiveDate>,
    #[serde(default)]
    trace_classification: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// CSV import settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Extra chrono date formats tried after the built-in ones
    #[serde(default)]
    pub date_formats: Vec<String>,
}

/// Loanbook configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub default_window_days: u32,
    /// Pinned "today"; `None` means the local calendar date
    pub reference_date: Option<NaiveDate>,
    pub trace_classification: bool,
    pub import: ImportSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_window_days: DEFAULT_WINDOW_DAYS,
            reference_date: None,
            trace_classification: false,
            import: ImportSettings::default(),
        }
    }
}

impl Config {
    /// Load config from the loanbook directory
    ///
    /// Environment overrides (for CI and scripted reports):
    /// `LOANBOOK_WINDOW_DAYS`, `LOANBOOK_REFERENCE_DATE` (YYYY-MM-DD).
    pub fn load(loanbook_dir: &Path) -> Result<Self> {
        let mut config = Self::load_saved(loanbook_dir)?;

        if let Ok(days) = std::env::var("LOANBOOK_WINDOW_DAYS") {
            config.default_window_days = days
                .trim()
                .parse()
                .with_context(|| format!("Invalid LOANBOOK_WINDOW_DAYS: {}", days))?;
        }
        if let Ok(date) = std::env::var("LOANBOOK_REFERENCE_DATE") {
            config.reference_date = Some(
                NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                    .with_context(|| format!("Invalid LOANBOOK_REFERENCE_DATE: {}", date))?,
            );
        }

        Ok(config)
    }

    /// Load only what settings.json holds, ignoring environment overrides
    pub fn load_saved(loanbook_dir: &Path) -> Result<Self> {
        let raw = Self::read_settings(loanbook_dir)?;
        Ok(Self {
            default_window_days: raw.app.default_window_days.unwrap_or(DEFAULT_WINDOW_DAYS),
            reference_date: raw.app.reference_date,
            trace_classification: raw.app.trace_classification,
            import: raw.import,
        })
    }

    /// Save config, preserving settings this crate doesn't manage
    pub fn save(&self, loanbook_dir: &Path) -> Result<()> {
        let mut settings = Self::read_settings(loanbook_dir)?;

        settings.app.default_window_days = Some(self.default_window_days);
        settings.app.reference_date = self.reference_date;
        settings.app.trace_classification = self.trace_classification;
        settings.import = self.import.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(loanbook_dir.join("settings.json"), content)?;
        Ok(())
    }

    fn read_settings(loanbook_dir: &Path) -> Result<SettingsFile> {
        let settings_path = loanbook_dir.join("settings.json");
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    /// Resolve the analysis window, falling back to configured defaults and
    /// finally to today's local date. This is the only place "today" is read.
    pub fn resolve_window(
        &self,
        window_days: Option<i64>,
        reference_date: Option<NaiveDate>,
    ) -> CoreResult<Window> {
        let days = window_days.unwrap_or(i64::from(self.default_window_days));
        let reference_date = reference_date
            .or(self.reference_date)
            .unwrap_or_else(|| Local::now().date_naive());
        Window::new(days, reference_date)
    }
}
