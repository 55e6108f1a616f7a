//! Persistence contracts and the SQLite implementation.
//!
//! The domain talks to flat repository-style traits; [`Database`]
//! implements all of them over a single SQLite connection. Entities are
//! composed in memory by the caller -- no lazy-loading object graph.

mod database;

pub use database::Database;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::booking::Booking;
use crate::error::{ConfigError, Result};
use crate::participant::{Instructor, ProgressRecord, Student, StudentStatus};
use crate::slot::{Slot, TimeWindow};
use crate::subscriber::Subscriber;

/// Posted availability persistence.
pub trait SlotStore {
    /// Atomically replace the student's posted (unbooked) slots for one
    /// week with `windows`, returning the new slot ids in input order.
    fn replace_week(
        &self,
        course_id: i64,
        student_id: i64,
        year: i32,
        week: u32,
        windows: &[TimeWindow],
    ) -> Result<Vec<i64>>;

    /// Delete the student's posted (unbooked) slots for one week.
    fn delete_posted_week(&self, course_id: i64, student_id: i64, year: i32, week: u32)
        -> Result<()>;

    /// Delete every posted (unbooked) slot the student holds.
    fn delete_posted(&self, course_id: i64, student_id: i64) -> Result<()>;

    fn get_slot(&self, slot_id: i64) -> Result<Option<Slot>>;

    /// One student's slots for a week.
    fn student_week_slots(
        &self,
        course_id: i64,
        student_id: i64,
        year: i32,
        week: u32,
    ) -> Result<Vec<Slot>>;

    /// All students' slots for a week, in posting order (for packing).
    fn course_week_slots(&self, course_id: i64, year: i32, week: u32) -> Result<Vec<Slot>>;

    /// Count of posted, unbooked slots on file.
    fn active_post_count(&self, course_id: i64, student_id: i64) -> Result<usize>;

    /// Count of posted, unbooked slots lying in the future of `today`.
    fn valid_post_count(&self, course_id: i64, student_id: i64, today: NaiveDate)
        -> Result<usize>;
}

/// Booking persistence.
pub trait BookingStore {
    fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>>;

    /// Transactional composite: mark the slot booked, insert the
    /// booking, and purge the student's other unbooked slots for the
    /// slot's week. Returns the new booking id.
    fn create_booking(&self, booking: &Booking) -> Result<i64>;

    fn delete_booking(&self, booking_id: i64) -> Result<()>;

    fn set_booking_inactive(&self, booking_id: i64, noshow: bool) -> Result<()>;

    fn confirm_booking(&self, booking_id: i64) -> Result<()>;

    /// An active booking of the instructor or the student overlapping
    /// the window.
    fn get_conflict(
        &self,
        instructor_id: i64,
        student_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Booking>>;

    /// The student's unconcluded booking, if any.
    fn active_booking(&self, course_id: i64, student_id: i64) -> Result<Option<Booking>>;

    /// No-show bookings for the student, oldest first.
    fn noshow_bookings(&self, course_id: i64, student_id: i64) -> Result<Vec<Booking>>;

    /// Start of the last conducted (past) session for the user; for
    /// instructors the date they last made a booking instead.
    fn last_session_date(
        &self,
        course_id: i64,
        user_id: i64,
        is_instructor: bool,
    ) -> Result<Option<DateTime<Utc>>>;
}

/// Student progress persistence (status, activity dates, flag map).
pub trait ProgressStore {
    fn save_progress(&self, course_id: i64, student_id: i64, record: &ProgressRecord)
        -> Result<()>;

    fn set_status(&self, course_id: i64, student_id: i64, status: StudentStatus) -> Result<()>;

    fn set_last_session_date(
        &self,
        course_id: i64,
        student_id: i64,
        date: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Course group membership (on-hold, keep-active).
/// `add_member` is idempotent; adding twice is safe.
pub trait GroupMembership {
    fn add_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<()>;
    fn remove_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<()>;
    fn is_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<bool>;
}

/// Enrolment suspension control.
pub trait EnrolmentControl {
    fn set_suspended(&self, course_id: i64, user_id: i64, suspended: bool) -> Result<()>;
}

/// Subscribed-course queries for the sweep.
pub trait CourseStore {
    fn subscribed_courses(&self) -> Result<Vec<Subscriber>>;

    fn get_course(&self, course_id: i64) -> Result<Option<Subscriber>>;

    /// Students filtered by status.
    fn students(&self, course_id: i64, status: Option<StudentStatus>) -> Result<Vec<Student>>;

    fn get_student(&self, course_id: i64, student_id: i64) -> Result<Option<Student>>;

    fn instructors(&self, course_id: i64) -> Result<Vec<Instructor>>;

    fn senior_instructor_ids(&self, course_id: i64) -> Result<Vec<i64>>;
}

/// Everything the sweep needs from persistence, in one bound.
pub trait Store:
    SlotStore
    + BookingStore
    + ProgressStore
    + CourseStore
    + GroupMembership
    + EnrolmentControl
    + crate::notify::NotificationDispatcher
{
}

impl<T> Store for T where
    T: SlotStore
        + BookingStore
        + ProgressStore
        + CourseStore
        + GroupMembership
        + EnrolmentControl
        + crate::notify::NotificationDispatcher
{
}

/// Directory holding the database file, honoring the configured
/// override and falling back to `~/.local/share/flightbook`.
pub fn data_dir(override_dir: Option<&PathBuf>) -> Result<PathBuf, ConfigError> {
    let dir = match override_dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .ok_or_else(|| ConfigError::LoadFailed {
                path: PathBuf::from("~/.local/share"),
                message: "no user data directory".to_string(),
            })?
            .join("flightbook"),
    };
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
