// src/utils/time.rs

//! Wall-clock helpers bound to the configured "today" timezone.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::error::{AppError, Result};
use crate::models::TimeLabel;

/// Build the fixed offset used for day boundaries and time labels.
pub fn offset(utc_offset_hours: i32) -> Result<FixedOffset> {
    utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            AppError::config(format!("utc_offset_hours out of range: {utc_offset_hours}"))
        })
}

/// Current time in the configured timezone.
pub fn now(utc_offset_hours: i32) -> Result<DateTime<FixedOffset>> {
    Ok(Utc::now().with_timezone(&offset(utc_offset_hours)?))
}

/// Name of the per-day snapshot folder, e.g. `2026-10-17`.
pub fn date_folder(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Snapshot label (`HH:MM`) of a capture taken at `at`.
pub fn capture_label(at: &DateTime<FixedOffset>) -> Result<TimeLabel> {
    TimeLabel::new(at.hour(), at.minute())
}

/// Timestamp printed in message footers.
pub fn display_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
