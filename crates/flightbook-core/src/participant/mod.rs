//! Course participants: students and instructors.
//!
//! Entities are flat rows composed by the caller from repository
//! queries -- no lazy-loaded object graph. Activity dates are stored as
//! instants but all restriction reasoning happens on course-local
//! calendar days (see [`crate::policy`]).

mod progress;

pub use progress::{ProgressFlag, ProgressRecord};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Training lifecycle status of a student.
///
/// Transitions are one-directional except suspended -> active
/// (no-show reinstatement) and onhold -> active (renewed activity);
/// graduated is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    #[serde(rename = "onhold")]
    OnHold,
    Suspended,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "onhold",
            Self::Suspended => "suspended",
            Self::Graduated => "graduated",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "onhold" => Self::OnHold,
            "suspended" => Self::Suspended,
            "graduated" => Self::Graduated,
            _ => Self::Active,
        }
    }
}

/// A student enrolled in a subscribing course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub status: StudentStatus,
    /// Start of the last conducted (past) booked session.
    pub last_session_date: Option<DateTime<Utc>>,
    /// Last time an exercise attempt was graded.
    pub last_graded_date: Option<DateTime<Utc>>,
    pub enrol_date: DateTime<Utc>,
    #[serde(default)]
    pub progress: ProgressRecord,
}

impl Student {
    pub fn is_on_hold(&self) -> bool {
        self.status == StudentStatus::OnHold
    }

    pub fn is_suspended(&self) -> bool {
        self.status == StudentStatus::Suspended
    }

    pub fn graduated(&self) -> bool {
        self.status == StudentStatus::Graduated
    }

    /// Enrolment date as a course-local calendar day.
    pub fn enrol_day(&self) -> NaiveDate {
        self.enrol_date.date_naive()
    }

    pub fn last_session_day(&self) -> Option<NaiveDate> {
        self.last_session_date.map(|d| d.date_naive())
    }

    pub fn last_graded_day(&self) -> Option<NaiveDate> {
        self.last_graded_date.map(|d| d.date_naive())
    }
}

/// An instructor attached to a subscribing course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    /// When the instructor last made a booking.
    pub last_booked_date: Option<DateTime<Utc>>,
    /// Senior instructors receive lifecycle carbon copies.
    pub senior: bool,
}

impl Instructor {
    pub fn last_booked_day(&self) -> Option<NaiveDate> {
        self.last_booked_date.map(|d| d.date_naive())
    }
}

/// Standing snapshot the lifecycle engine evaluates a student against,
/// assembled from the stores before each tick.
#[derive(Debug, Clone, Default)]
pub struct StudentStanding {
    /// Posted, unbooked slots in the future ("valid" posts).
    pub valid_posts: usize,
    /// All posted, unbooked slots on file ("active" posts).
    pub active_posts: usize,
    /// An unconcluded booking exists for the student.
    pub has_active_booking: bool,
    /// Keep-active group membership: an explicit freeze on transitions.
    pub kept_active: bool,
}

impl StudentStanding {
    /// Conditions under which an active student is never advanced:
    /// posted availability, an active booking, or the explicit
    /// keep-active override.
    pub fn keeps_active(&self) -> bool {
        self.kept_active || self.has_active_booking || self.valid_posts > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            StudentStatus::Active,
            StudentStatus::OnHold,
            StudentStatus::Suspended,
            StudentStatus::Graduated,
        ] {
            assert_eq!(StudentStatus::parse(status.as_str()), status);
        }
        // unknown strings degrade to active rather than failing the row
        assert_eq!(StudentStatus::parse("???"), StudentStatus::Active);
    }

    #[test]
    fn standing_keeps_active() {
        let mut standing = StudentStanding::default();
        assert!(!standing.keeps_active());

        standing.valid_posts = 1;
        assert!(standing.keeps_active());

        standing = StudentStanding {
            kept_active: true,
            ..StudentStanding::default()
        };
        assert!(standing.keeps_active());
    }
}
