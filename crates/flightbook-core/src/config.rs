//! Plugin-wide constants and TOML application configuration.
//!
//! Course-level restriction settings live in the database (see
//! [`crate::policy::RestrictionConfig`]); this module carries the fixed
//! constants shared by every course and the app-level configuration
//! stored at `~/.config/flightbook/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Grace days added to the posting wait period before the inactivity
/// warning fires.
pub const OVERDUE_GRACE_DAYS: i64 = 7;

/// Days before the on-hold date at which the on-hold warning fires.
pub const ON_HOLD_WARNING_LEAD_DAYS: i64 = 7;

/// Fixed suspension period for the two-no-show path, counted from the
/// first no-show session. Separate from the course suspension timer.
pub const NOSHOW_SUSPENSION_DAYS: i64 = 30;

/// Number of no-show bookings that triggers the reinstatement timer.
pub const NOSHOW_REINSTATEMENT_COUNT: usize = 2;

/// Hard cap on lanes shown in a week view. Overflow lanes are dropped
/// from the capped view; the raw count is preserved for UI hinting.
pub const MAX_LANES: usize = 10;

/// Minimum lane count reported for the all-students view so the grid
/// keeps a stable width.
pub const MIN_LANES: usize = 4;

/// Default number of weeks ahead students may post availability.
/// 0 means unlimited.
pub const DEFAULT_WEEKS_LOOKAHEAD: u32 = 5;

/// Group name holding students placed on hold.
pub const ONHOLD_GROUP: &str = "OnHold";

/// Group name holding students exempt from inactivity restrictions.
pub const KEEP_ACTIVE_GROUP: &str = "Keep Active";

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Override for the data directory holding the database file.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Number of weeks ahead students may post availability.
    #[serde(default = "default_weeks_lookahead")]
    pub weeks_lookahead: u32,
}

fn default_weeks_lookahead() -> u32 {
    DEFAULT_WEEKS_LOOKAHEAD
}

impl AppConfig {
    /// Load configuration from the default path, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self {
                weeks_lookahead: DEFAULT_WEEKS_LOOKAHEAD,
                ..Self::default()
            });
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Path to `config.toml` under the user config directory.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or_else(|| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: "no user config directory".to_string(),
        })?;
        Ok(base.join("flightbook").join("config.toml"))
    }
}
