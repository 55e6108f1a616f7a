//! Shared helpers for CLI commands.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use flightbook_core::config::AppConfig;
use flightbook_core::storage::data_dir;
use flightbook_core::{Database, TimeWindow};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the database honoring the configured data directory.
pub fn open_db() -> Result<Database, Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let dir = data_dir(config.data_dir.as_ref())?;
    Ok(Database::open(dir)?)
}

/// Parse a `start/end` RFC 3339 pair into a window, e.g.
/// `2025-06-05T09:00:00Z/2025-06-05T10:00:00Z`.
pub fn parse_window(raw: &str) -> Result<TimeWindow, Box<dyn std::error::Error>> {
    let (start, end) = raw
        .split_once('/')
        .ok_or("window must be <start>/<end> in RFC 3339")?;
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(start.trim())?.with_timezone(&Utc);
    let end: DateTime<Utc> = DateTime::parse_from_rfc3339(end.trim())?.with_timezone(&Utc);
    Ok(TimeWindow::new(start, end)?)
}

/// ISO week/year a window belongs to, keyed by its start.
pub fn iso_week_of(window: &TimeWindow) -> (i32, u32) {
    let week = window.start().iso_week();
    (week.year(), week.week())
}

/// Parse a `YYYY-MM-DD` day, defaulting to today.
pub fn parse_day(raw: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(Utc::now().date_naive()),
    }
}
