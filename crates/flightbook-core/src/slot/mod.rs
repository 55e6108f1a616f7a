//! Availability slots and time windows.
//!
//! A slot is a contiguous time window a student marks as available
//! within a week. Slots are replaced wholesale when the student re-posts
//! for the same week; a booked slot is flagged rather than deleted so
//! booking history survives for statistics.

mod lanes;

pub use lanes::{Lane, LanePacker, WeekLanes};

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An immutable start/end instant pair.
///
/// Invariant: `start < end`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Closed-interval overlap: windows sharing only a boundary instant
    /// still count as overlapping.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely within this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A posted availability slot owned by exactly one student.
///
/// Lifecycle: posted -> booked -> (consumed | cancelled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub window: TimeWindow,
    /// ISO week number the slot was posted under.
    pub week: u32,
    pub year: i32,
    /// Set when a booking consumed this slot; booked slots are retained,
    /// not deleted.
    pub booked: bool,
}

impl Slot {
    /// Construct an unpersisted slot (id 0) for a student's posting.
    pub fn post(
        student_id: i64,
        course_id: i64,
        window: TimeWindow,
        year: i32,
        week: u32,
    ) -> Self {
        Self {
            id: 0,
            student_id,
            course_id,
            window,
            week,
            year,
            booked: false,
        }
    }

    /// The weekday the slot starts on.
    pub fn weekday(&self) -> Weekday {
        self.window.start().weekday()
    }

    /// Whether the slot's start falls on the given calendar day.
    pub fn starts_on(&self, day: chrono::NaiveDate) -> bool {
        self.window.start().date_naive() == day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(TimeWindow::new(at(10, 0), at(9, 0)).is_err());
        assert!(TimeWindow::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn closed_interval_overlap() {
        let a = TimeWindow::new(at(9, 0), at(10, 0)).unwrap();
        let b = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        let c = TimeWindow::new(at(11, 30), at(12, 0)).unwrap();

        // shared boundary instant counts as overlap
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn containment() {
        let outer = TimeWindow::new(at(9, 0), at(12, 0)).unwrap();
        let inner = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn slot_weekday_from_window_start() {
        let w = TimeWindow::new(at(9, 0), at(10, 0)).unwrap();
        let slot = Slot::post(7, 1, w, 2025, 23);
        assert_eq!(slot.weekday(), Weekday::Mon);
        assert!(slot.starts_on(chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
    }
}
