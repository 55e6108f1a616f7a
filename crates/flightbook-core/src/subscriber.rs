//! A course subscribed to session booking.

use serde::{Deserialize, Serialize};

use crate::policy::RestrictionConfig;

/// Course-level subscription row: identity plus restriction settings.
///
/// A course with a missing or unparsable settings row loads with an
/// all-zero [`RestrictionConfig`], i.e. every restriction disabled --
/// misconfiguration never penalizes students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub shortname: String,
    pub subscribed: bool,
    #[serde(default)]
    pub config: RestrictionConfig,
}

impl Subscriber {
    pub fn new(id: i64, shortname: impl Into<String>, config: RestrictionConfig) -> Self {
        Self {
            id,
            shortname: shortname.into(),
            subscribed: true,
            config,
        }
    }
}
