//! Wait anchor and recency computation.

use chrono::NaiveDate;

use crate::participant::Student;

/// The reference day all restriction deadlines count from.
///
/// Fallback chain: last conducted session, else last graded date, else
/// enrolment date. The first non-empty entry wins.
pub fn wait_anchor(student: &Student) -> NaiveDate {
    student
        .last_session_day()
        .or_else(|| student.last_graded_day())
        .unwrap_or_else(|| student.enrol_day())
}

/// Whole days elapsed between the wait anchor and `today`, clamped at
/// zero when the anchor sits in the future (clock skew, bad data).
pub fn recency_days(student: &Student, today: NaiveDate) -> i64 {
    (today - wait_anchor(student)).num_days().max(0)
}
