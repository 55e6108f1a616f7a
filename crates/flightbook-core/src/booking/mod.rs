//! Bookings: a confirmed pairing of one student slot and one instructor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConflictError, CoreError, DatabaseError, Result};
use crate::slot::Slot;
use crate::storage::{BookingStore, ProgressStore, SlotStore};

/// A booked session. `active = false` marks a historical/completed
/// booking retained for audit and recency computation; a no-show
/// booking is terminal and feeds the suspension counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub course_id: i64,
    pub exercise_id: i64,
    pub student_id: i64,
    pub instructor_id: i64,
    pub slot: Slot,
    pub confirmed: bool,
    pub active: bool,
    pub noshow: bool,
    pub booking_date: DateTime<Utc>,
}

impl Booking {
    /// Assemble an unpersisted booking (id 0) over a posted slot.
    pub fn request(
        course_id: i64,
        exercise_id: i64,
        student_id: i64,
        instructor_id: i64,
        slot: Slot,
    ) -> Self {
        Self {
            id: 0,
            course_id,
            exercise_id,
            student_id,
            instructor_id,
            slot,
            confirmed: false,
            active: true,
            noshow: false,
            booking_date: Utc::now(),
        }
    }
}

/// Records and cancels bookings against the stores.
///
/// All multi-row writes go through the stores' transactional composite
/// operations; a partial write (booking saved, stale posts kept) never
/// becomes visible.
pub struct BookingLedger<'a> {
    slots: &'a dyn SlotStore,
    bookings: &'a dyn BookingStore,
    progress: &'a dyn ProgressStore,
}

impl<'a> BookingLedger<'a> {
    pub fn new(
        slots: &'a dyn SlotStore,
        bookings: &'a dyn BookingStore,
        progress: &'a dyn ProgressStore,
    ) -> Self {
        Self {
            slots,
            bookings,
            progress,
        }
    }

    /// Book a student's posted slot for an instructor-led session.
    ///
    /// Rejects with [`ConflictError::SlotTaken`] when the slot was
    /// already consumed and [`ConflictError::OverlappingBooking`] when
    /// the instructor or the student holds an overlapping active
    /// booking. On success the slot is marked booked, the booking
    /// saved, and the student's other unbooked posts for that week
    /// purged, atomically.
    pub fn book(
        &self,
        instructor_id: i64,
        student_id: i64,
        exercise_id: i64,
        slot_id: i64,
    ) -> Result<Booking> {
        let slot = self
            .slots
            .get_slot(slot_id)?
            .ok_or(CoreError::Database(DatabaseError::NotFound {
                entity: "slot",
                id: slot_id,
            }))?;

        if slot.booked {
            return Err(ConflictError::SlotTaken { slot_id }.into());
        }

        if let Some(existing) = self.bookings.get_conflict(
            instructor_id,
            student_id,
            slot.window.start(),
            slot.window.end(),
        )? {
            return Err(ConflictError::OverlappingBooking {
                booking_id: existing.id,
                start: slot.window.start(),
                end: slot.window.end(),
            }
            .into());
        }

        let mut booking = Booking::request(
            slot.course_id,
            exercise_id,
            student_id,
            instructor_id,
            slot,
        );
        booking.id = self.bookings.create_booking(&booking)?;
        Ok(booking)
    }

    /// Student confirmation of an instructor-proposed booking.
    pub fn confirm(&self, booking_id: i64) -> Result<()> {
        self.bookings.confirm_booking(booking_id)
    }

    /// Conclude a booked session: the booking is deactivated but
    /// retained, and the student's posts are cleared.
    pub fn conclude(&self, booking: &Booking) -> Result<()> {
        self.bookings.set_booking_inactive(booking.id, false)?;
        self.slots
            .delete_posted(booking.course_id, booking.student_id)?;
        self.refresh_last_session(booking)
    }

    /// Cancel a booking. A no-show deactivates and retains the booking
    /// (it feeds the reinstatement counter); a plain cancellation
    /// deletes the booking together with its slot.
    pub fn cancel(&self, booking: &Booking, noshow: bool) -> Result<()> {
        if noshow {
            self.bookings.set_booking_inactive(booking.id, true)?;
            self.slots
                .delete_posted(booking.course_id, booking.student_id)?;
        } else {
            self.bookings.delete_booking(booking.id)?;
        }
        self.refresh_last_session(booking)
    }

    /// Recompute the student's last conducted session from what remains
    /// in the booking history.
    fn refresh_last_session(&self, booking: &Booking) -> Result<()> {
        let last = self
            .bookings
            .last_session_date(booking.course_id, booking.student_id, false)?;
        self.progress
            .set_last_session_date(booking.course_id, booking.student_id, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{ProgressRecord, Student, StudentStatus};
    use crate::slot::TimeWindow;
    use crate::storage::Database;
    use chrono::{TimeZone, Utc};

    fn setup() -> Database {
        let db = Database::open_memory().unwrap();
        for id in [7, 8] {
            db.upsert_student(&Student {
                id,
                course_id: 1,
                name: format!("Student {id}"),
                status: StudentStatus::Active,
                last_session_date: None,
                last_graded_date: None,
                enrol_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                progress: ProgressRecord::default(),
            })
            .unwrap();
        }
        db
    }

    fn post_slot(db: &Database, student_id: i64, day: u32, hour: u32) -> i64 {
        let start = Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + chrono::Duration::hours(1)).unwrap();
        db.replace_week(1, student_id, 2025, 23, &[window]).unwrap()[0]
    }

    #[test]
    fn book_consumes_the_slot() {
        let db = setup();
        let slot_id = post_slot(&db, 7, 2, 9);
        let ledger = BookingLedger::new(&db, &db, &db);

        let booking = ledger.book(5, 7, 42, slot_id).unwrap();
        assert!(booking.id > 0);
        assert!(booking.active);
        assert!(!booking.confirmed);

        let slot = db.get_slot(slot_id).unwrap().unwrap();
        assert!(slot.booked);
    }

    #[test]
    fn book_rejects_consumed_slot() {
        let db = setup();
        let slot_id = post_slot(&db, 7, 2, 9);
        let ledger = BookingLedger::new(&db, &db, &db);
        ledger.book(5, 7, 42, slot_id).unwrap();

        let err = ledger.book(6, 7, 42, slot_id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(ConflictError::SlotTaken { .. })
        ));
    }

    #[test]
    fn book_rejects_overlapping_instructor_booking() {
        let db = setup();
        let ledger = BookingLedger::new(&db, &db, &db);

        let first = post_slot(&db, 7, 2, 9);
        ledger.book(5, 7, 42, first).unwrap();

        // second student posts an overlapping window; same instructor
        let second = post_slot(&db, 8, 2, 9);
        let err = ledger.book(5, 8, 42, second).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(ConflictError::OverlappingBooking { .. })
        ));
    }

    #[test]
    fn noshow_cancel_retains_booking() {
        let db = setup();
        let slot_id = post_slot(&db, 7, 2, 9);
        let ledger = BookingLedger::new(&db, &db, &db);
        let booking = ledger.book(5, 7, 42, slot_id).unwrap();

        ledger.cancel(&booking, true).unwrap();

        let stored = db.get_booking(booking.id).unwrap().unwrap();
        assert!(!stored.active);
        assert!(stored.noshow);
        assert_eq!(db.noshow_bookings(1, 7).unwrap().len(), 1);
    }

    #[test]
    fn plain_cancel_deletes_booking_and_slot() {
        let db = setup();
        let slot_id = post_slot(&db, 7, 2, 9);
        let ledger = BookingLedger::new(&db, &db, &db);
        let booking = ledger.book(5, 7, 42, slot_id).unwrap();

        ledger.cancel(&booking, false).unwrap();

        assert!(db.get_booking(booking.id).unwrap().is_none());
        assert!(db.get_slot(slot_id).unwrap().is_none());
    }
}
