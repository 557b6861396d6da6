//! Analysis window configuration

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::result::{Error, Result};

/// A trailing span of calendar days ending at `reference_date` (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub days: u32,
    pub reference_date: NaiveDate,
}

impl Window {
    /// Validate and build a window; a non-positive size is a configuration error
    pub fn new(days: i64, reference_date: NaiveDate) -> Result<Self> {
        if days <= 0 {
            return Err(Error::configuration(format!(
                "window size must be a positive number of days, got {}",
                days
            )));
        }
        let days = u32::try_from(days).map_err(|_| {
            Error::configuration(format!("window size {} is too large", days))
        })?;
        // Reject windows that would run off the start of the calendar
        reference_date
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "window of {} days before {} is out of range",
                    days, reference_date
                ))
            })?;
        Ok(Self { days, reference_date })
    }

    /// First (oldest) day in the window
    pub fn start_date(&self) -> NaiveDate {
        self.reference_date - Duration::days(i64::from(self.days) - 1)
    }

    /// Days of the window, newest first
    pub fn days_newest_first(&self) -> impl Iterator<Item = NaiveDate> {
        let reference = self.reference_date;
        (0..i64::from(self.days)).map(move |offset| reference - Duration::days(offset))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.reference_date
    }
}
