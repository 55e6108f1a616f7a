//! SQLite-backed implementation of the persistence contracts.
//!
//! One connection, migrate-on-open, datetimes as RFC 3339 text. The
//! composite operations (week replace, booking creation) run inside a
//! transaction so a partial write never becomes visible.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

use super::{
    BookingStore, CourseStore, EnrolmentControl, GroupMembership, ProgressStore, SlotStore,
};
use crate::booking::Booking;
use crate::config::ONHOLD_GROUP;
use crate::error::{ConflictError, CoreError, DatabaseError, Result};
use crate::notify::{Notification, NotificationDispatcher};
use crate::participant::{Instructor, ProgressRecord, Student, StudentStatus};
use crate::policy::RestrictionConfig;
use crate::slot::{Slot, TimeWindow};
use crate::subscriber::Subscriber;

// === Row helpers ===

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_datetime_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn fmt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn row_to_slot(row: &Row) -> Result<Slot, rusqlite::Error> {
    let start = parse_datetime(&row.get::<_, String>(3)?)?;
    let end = parse_datetime(&row.get::<_, String>(4)?)?;
    let window = TimeWindow::new(start, end).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Slot {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        window,
        week: row.get(5)?,
        year: row.get(6)?,
        booked: row.get(7)?,
    })
}

const SLOT_COLUMNS: &str = "s.id, s.student_id, s.course_id, s.start_time, s.end_time, s.week, s.year, s.booked";

const BOOKING_COLUMNS: &str = "b.id, b.course_id, b.exercise_id, b.student_id, b.instructor_id, \
     b.confirmed, b.active, b.noshow, b.booking_date, \
     s.id, s.student_id, s.course_id, s.start_time, s.end_time, s.week, s.year, s.booked";

fn row_to_booking(row: &Row) -> Result<Booking, rusqlite::Error> {
    let start = parse_datetime(&row.get::<_, String>(12)?)?;
    let end = parse_datetime(&row.get::<_, String>(13)?)?;
    let window = TimeWindow::new(start, end).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Booking {
        id: row.get(0)?,
        course_id: row.get(1)?,
        exercise_id: row.get(2)?,
        student_id: row.get(3)?,
        instructor_id: row.get(4)?,
        confirmed: row.get(5)?,
        active: row.get(6)?,
        noshow: row.get(7)?,
        booking_date: parse_datetime(&row.get::<_, String>(8)?)?,
        slot: Slot {
            id: row.get(9)?,
            student_id: row.get(10)?,
            course_id: row.get(11)?,
            window,
            week: row.get(14)?,
            year: row.get(15)?,
            booked: row.get(16)?,
        },
    })
}

fn row_to_student(row: &Row) -> Result<Student, rusqlite::Error> {
    Ok(Student {
        id: row.get(0)?,
        course_id: row.get(1)?,
        name: row.get(2)?,
        status: StudentStatus::parse(&row.get::<_, String>(3)?),
        last_session_date: parse_datetime_opt(row.get(4)?)?,
        last_graded_date: parse_datetime_opt(row.get(5)?)?,
        enrol_date: parse_datetime(&row.get::<_, String>(6)?)?,
        progress: ProgressRecord::from_json(&row.get::<_, String>(7)?),
    })
}

fn row_to_instructor(row: &Row) -> Result<Instructor, rusqlite::Error> {
    Ok(Instructor {
        id: row.get(0)?,
        course_id: row.get(1)?,
        name: row.get(2)?,
        last_booked_date: parse_datetime_opt(row.get(3)?)?,
        senior: row.get(4)?,
    })
}

fn row_to_course(row: &Row) -> Result<Subscriber, rusqlite::Error> {
    Ok(Subscriber {
        id: row.get(0)?,
        shortname: row.get(1)?,
        subscribed: row.get(2)?,
        config: RestrictionConfig {
            posting_wait_days: row.get(3)?,
            on_hold_period_days: row.get(4)?,
            suspension_period_days: row.get(5)?,
            overdue_period_days: row.get(6)?,
        },
    })
}

/// Start of a calendar day in UTC as the stored text form, for
/// lexicographic comparison against RFC 3339 columns.
fn day_floor(day: NaiveDate) -> String {
    format!("{day}T00:00:00+00:00")
}

/// SQLite database backing every store trait.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/flightbook.db`, creating the
    /// schema if needed.
    pub fn open(dir: PathBuf) -> Result<Self> {
        let path = dir.join("flightbook.db");
        let conn = Connection::open(&path).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed { path, source })
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS courses (
                    id                     INTEGER PRIMARY KEY,
                    shortname              TEXT NOT NULL,
                    subscribed             INTEGER NOT NULL DEFAULT 1,
                    posting_wait_days      INTEGER NOT NULL DEFAULT 0,
                    on_hold_period_days    INTEGER NOT NULL DEFAULT 0,
                    suspension_period_days INTEGER NOT NULL DEFAULT 0,
                    overdue_period_days    INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS students (
                    id                INTEGER NOT NULL,
                    course_id         INTEGER NOT NULL,
                    name              TEXT NOT NULL DEFAULT '',
                    status            TEXT NOT NULL DEFAULT 'active',
                    last_session_date TEXT,
                    last_graded_date  TEXT,
                    enrol_date        TEXT NOT NULL,
                    progress_flags    TEXT NOT NULL DEFAULT '{}',
                    PRIMARY KEY (id, course_id)
                );

                CREATE TABLE IF NOT EXISTS instructors (
                    id               INTEGER NOT NULL,
                    course_id        INTEGER NOT NULL,
                    name             TEXT NOT NULL DEFAULT '',
                    last_booked_date TEXT,
                    senior           INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (id, course_id)
                );

                CREATE TABLE IF NOT EXISTS slots (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_id INTEGER NOT NULL,
                    course_id  INTEGER NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time   TEXT NOT NULL,
                    week       INTEGER NOT NULL,
                    year       INTEGER NOT NULL,
                    booked     INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS bookings (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    course_id     INTEGER NOT NULL,
                    exercise_id   INTEGER NOT NULL,
                    student_id    INTEGER NOT NULL,
                    instructor_id INTEGER NOT NULL,
                    slot_id       INTEGER NOT NULL,
                    confirmed     INTEGER NOT NULL DEFAULT 0,
                    active        INTEGER NOT NULL DEFAULT 1,
                    noshow        INTEGER NOT NULL DEFAULT 0,
                    booking_date  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS group_members (
                    course_id  INTEGER NOT NULL,
                    group_name TEXT NOT NULL,
                    user_id    INTEGER NOT NULL,
                    PRIMARY KEY (course_id, group_name, user_id)
                );

                CREATE TABLE IF NOT EXISTS notifications (
                    id           TEXT PRIMARY KEY,
                    kind         TEXT NOT NULL,
                    course_id    INTEGER NOT NULL,
                    recipient_id INTEGER NOT NULL,
                    cc_ids       TEXT NOT NULL DEFAULT '[]',
                    payload      TEXT NOT NULL DEFAULT '{}',
                    created_at   TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_slots_course_week
                    ON slots(course_id, year, week);
                CREATE INDEX IF NOT EXISTS idx_slots_student
                    ON slots(course_id, student_id);
                CREATE INDEX IF NOT EXISTS idx_bookings_instructor
                    ON bookings(instructor_id, active);
                CREATE INDEX IF NOT EXISTS idx_bookings_student
                    ON bookings(course_id, student_id);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // === Seeding / admin (used by the CLI and tests) ===

    pub fn upsert_course(&self, course: &Subscriber) -> Result<()> {
        self.conn.execute(
            "INSERT INTO courses (id, shortname, subscribed, posting_wait_days,
                 on_hold_period_days, suspension_period_days, overdue_period_days)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET shortname = ?2, subscribed = ?3,
                 posting_wait_days = ?4, on_hold_period_days = ?5,
                 suspension_period_days = ?6, overdue_period_days = ?7",
            params![
                course.id,
                course.shortname,
                course.subscribed,
                course.config.posting_wait_days,
                course.config.on_hold_period_days,
                course.config.suspension_period_days,
                course.config.overdue_period_days,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_student(&self, student: &Student) -> Result<()> {
        self.conn.execute(
            "INSERT INTO students (id, course_id, name, status, last_session_date,
                 last_graded_date, enrol_date, progress_flags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id, course_id) DO UPDATE SET name = ?3, status = ?4,
                 last_session_date = ?5, last_graded_date = ?6, enrol_date = ?7,
                 progress_flags = ?8",
            params![
                student.id,
                student.course_id,
                student.name,
                student.status.as_str(),
                student.last_session_date.map(fmt),
                student.last_graded_date.map(fmt),
                fmt(student.enrol_date),
                student.progress.to_json(),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_instructor(&self, instructor: &Instructor) -> Result<()> {
        self.conn.execute(
            "INSERT INTO instructors (id, course_id, name, last_booked_date, senior)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id, course_id) DO UPDATE SET name = ?3,
                 last_booked_date = ?4, senior = ?5",
            params![
                instructor.id,
                instructor.course_id,
                instructor.name,
                instructor.last_booked_date.map(fmt),
                instructor.senior,
            ],
        )?;
        Ok(())
    }

    /// Queued notifications, oldest first (for the CLI and tests).
    pub fn pending_notifications(&self) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, course_id, recipient_id, cc_ids, payload, created_at
             FROM notifications ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut notifications = Vec::new();
        for row in rows {
            let (id, kind, course_id, recipient_id, cc_ids, payload, created_at) = row?;
            let kind = serde_json::from_value(serde_json::Value::String(kind))?;
            notifications.push(Notification {
                id,
                kind,
                course_id,
                recipient_id,
                cc_ids: serde_json::from_str(&cc_ids)?,
                payload: serde_json::from_str(&payload)?,
                created_at: parse_datetime(&created_at).map_err(DatabaseError::from)?,
            });
        }
        Ok(notifications)
    }
}

impl SlotStore for Database {
    fn replace_week(
        &self,
        course_id: i64,
        student_id: i64,
        year: i32,
        week: u32,
        windows: &[TimeWindow],
    ) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction().map_err(DatabaseError::from)?;
        tx.execute(
            "DELETE FROM slots WHERE course_id = ?1 AND student_id = ?2
                 AND year = ?3 AND week = ?4 AND booked = 0",
            params![course_id, student_id, year, week],
        )
        .map_err(DatabaseError::from)?;

        let mut ids = Vec::with_capacity(windows.len());
        for window in windows {
            tx.execute(
                "INSERT INTO slots (student_id, course_id, start_time, end_time, week, year, booked)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    student_id,
                    course_id,
                    fmt(window.start()),
                    fmt(window.end()),
                    week,
                    year,
                ],
            )
            .map_err(DatabaseError::from)?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(ids)
    }

    fn delete_posted_week(
        &self,
        course_id: i64,
        student_id: i64,
        year: i32,
        week: u32,
    ) -> Result<()> {
        self.conn.execute(
            "DELETE FROM slots WHERE course_id = ?1 AND student_id = ?2
                 AND year = ?3 AND week = ?4 AND booked = 0",
            params![course_id, student_id, year, week],
        )?;
        Ok(())
    }

    fn delete_posted(&self, course_id: i64, student_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM slots WHERE course_id = ?1 AND student_id = ?2 AND booked = 0",
            params![course_id, student_id],
        )?;
        Ok(())
    }

    fn get_slot(&self, slot_id: i64) -> Result<Option<Slot>> {
        let slot = self
            .conn
            .prepare(&format!("SELECT {SLOT_COLUMNS} FROM slots s WHERE s.id = ?1"))?
            .query_row(params![slot_id], row_to_slot)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(slot)
    }

    fn student_week_slots(
        &self,
        course_id: i64,
        student_id: i64,
        year: i32,
        week: u32,
    ) -> Result<Vec<Slot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots s
             WHERE s.course_id = ?1 AND s.student_id = ?2 AND s.year = ?3 AND s.week = ?4
             ORDER BY s.id"
        ))?;
        let slots = stmt
            .query_map(params![course_id, student_id, year, week], row_to_slot)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(slots)
    }

    fn course_week_slots(&self, course_id: i64, year: i32, week: u32) -> Result<Vec<Slot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots s
             WHERE s.course_id = ?1 AND s.year = ?2 AND s.week = ?3
             ORDER BY s.id"
        ))?;
        let slots = stmt
            .query_map(params![course_id, year, week], row_to_slot)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(slots)
    }

    fn active_post_count(&self, course_id: i64, student_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM slots
             WHERE course_id = ?1 AND student_id = ?2 AND booked = 0",
            params![course_id, student_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn valid_post_count(
        &self,
        course_id: i64,
        student_id: i64,
        today: NaiveDate,
    ) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM slots
             WHERE course_id = ?1 AND student_id = ?2 AND booked = 0 AND end_time >= ?3",
            params![course_id, student_id, day_floor(today)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl BookingStore for Database {
    fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>> {
        let booking = self
            .conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b
                 JOIN slots s ON s.id = b.slot_id WHERE b.id = ?1"
            ))?
            .query_row(params![booking_id], row_to_booking)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(booking)
    }

    fn create_booking(&self, booking: &Booking) -> Result<i64> {
        let tx = self.conn.unchecked_transaction().map_err(DatabaseError::from)?;

        // consume the slot; losing the race means someone booked it first
        let consumed = tx
            .execute(
                "UPDATE slots SET booked = 1 WHERE id = ?1 AND booked = 0",
                params![booking.slot.id],
            )
            .map_err(DatabaseError::from)?;
        if consumed == 0 {
            return Err(ConflictError::SlotTaken {
                slot_id: booking.slot.id,
            }
            .into());
        }

        tx.execute(
            "INSERT INTO bookings (course_id, exercise_id, student_id, instructor_id,
                 slot_id, confirmed, active, noshow, booking_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                booking.course_id,
                booking.exercise_id,
                booking.student_id,
                booking.instructor_id,
                booking.slot.id,
                booking.confirmed,
                booking.active,
                booking.noshow,
                fmt(booking.booking_date),
            ],
        )
        .map_err(DatabaseError::from)?;
        let id = tx.last_insert_rowid();

        // a booked student may not keep stray postings for that week
        tx.execute(
            "DELETE FROM slots WHERE course_id = ?1 AND student_id = ?2
                 AND year = ?3 AND week = ?4 AND booked = 0",
            params![
                booking.course_id,
                booking.student_id,
                booking.slot.year,
                booking.slot.week,
            ],
        )
        .map_err(DatabaseError::from)?;

        tx.execute(
            "UPDATE instructors SET last_booked_date = ?1
             WHERE id = ?2 AND course_id = ?3",
            params![fmt(booking.booking_date), booking.instructor_id, booking.course_id],
        )
        .map_err(DatabaseError::from)?;

        tx.commit().map_err(DatabaseError::from)?;
        Ok(id)
    }

    fn delete_booking(&self, booking_id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction().map_err(DatabaseError::from)?;
        let slot_id: Option<i64> = tx
            .query_row(
                "SELECT slot_id FROM bookings WHERE id = ?1",
                params![booking_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(DatabaseError::from)?;
        tx.execute("DELETE FROM bookings WHERE id = ?1", params![booking_id])
            .map_err(DatabaseError::from)?;
        if let Some(slot_id) = slot_id {
            tx.execute("DELETE FROM slots WHERE id = ?1", params![slot_id])
                .map_err(DatabaseError::from)?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    fn set_booking_inactive(&self, booking_id: i64, noshow: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE bookings SET active = 0, noshow = ?2 WHERE id = ?1",
            params![booking_id, noshow],
        )?;
        Ok(())
    }

    fn confirm_booking(&self, booking_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE bookings SET confirmed = 1 WHERE id = ?1",
            params![booking_id],
        )?;
        Ok(())
    }

    fn get_conflict(
        &self,
        instructor_id: i64,
        student_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        let booking = self
            .conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b
                 JOIN slots s ON s.id = b.slot_id
                 WHERE (b.instructor_id = ?1 OR b.student_id = ?2) AND b.active = 1
                   AND s.start_time <= ?4 AND ?3 <= s.end_time
                 LIMIT 1"
            ))?
            .query_row(
                params![instructor_id, student_id, fmt(start), fmt(end)],
                row_to_booking,
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(booking)
    }

    fn active_booking(&self, course_id: i64, student_id: i64) -> Result<Option<Booking>> {
        let booking = self
            .conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b
                 JOIN slots s ON s.id = b.slot_id
                 WHERE b.course_id = ?1 AND b.student_id = ?2 AND b.active = 1
                 ORDER BY s.start_time LIMIT 1"
            ))?
            .query_row(params![course_id, student_id], row_to_booking)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(booking)
    }

    fn noshow_bookings(&self, course_id: i64, student_id: i64) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b
             JOIN slots s ON s.id = b.slot_id
             WHERE b.course_id = ?1 AND b.student_id = ?2 AND b.noshow = 1
             ORDER BY s.start_time"
        ))?;
        let bookings = stmt
            .query_map(params![course_id, student_id], row_to_booking)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(bookings)
    }

    fn last_session_date(
        &self,
        course_id: i64,
        user_id: i64,
        is_instructor: bool,
    ) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = if is_instructor {
            self.conn
                .query_row(
                    "SELECT MAX(booking_date) FROM bookings
                     WHERE course_id = ?1 AND instructor_id = ?2",
                    params![course_id, user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(DatabaseError::from)?
                .flatten()
        } else {
            self.conn
                .query_row(
                    "SELECT MAX(s.start_time) FROM bookings b
                     JOIN slots s ON s.id = b.slot_id
                     WHERE b.course_id = ?1 AND b.student_id = ?2
                       AND b.noshow = 0 AND s.start_time <= ?3",
                    params![course_id, user_id, fmt(Utc::now())],
                    |row| row.get(0),
                )
                .optional()
                .map_err(DatabaseError::from)?
                .flatten()
        };
        Ok(parse_datetime_opt(raw).map_err(DatabaseError::from)?)
    }
}

impl ProgressStore for Database {
    fn save_progress(
        &self,
        course_id: i64,
        student_id: i64,
        record: &ProgressRecord,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE students SET progress_flags = ?3 WHERE id = ?1 AND course_id = ?2",
            params![student_id, course_id, record.to_json()],
        )?;
        Ok(())
    }

    fn set_status(&self, course_id: i64, student_id: i64, status: StudentStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE students SET status = ?3 WHERE id = ?1 AND course_id = ?2",
            params![student_id, course_id, status.as_str()],
        )?;
        Ok(())
    }

    fn set_last_session_date(
        &self,
        course_id: i64,
        student_id: i64,
        date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE students SET last_session_date = ?3 WHERE id = ?1 AND course_id = ?2",
            params![student_id, course_id, date.map(fmt)],
        )?;
        Ok(())
    }
}

impl GroupMembership for Database {
    fn add_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<()> {
        // idempotent by design of the sweep contract
        self.conn.execute(
            "INSERT OR IGNORE INTO group_members (course_id, group_name, user_id)
             VALUES (?1, ?2, ?3)",
            params![course_id, group, user_id],
        )?;
        Ok(())
    }

    fn remove_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM group_members WHERE course_id = ?1 AND group_name = ?2 AND user_id = ?3",
            params![course_id, group, user_id],
        )?;
        Ok(())
    }

    fn is_member(&self, course_id: i64, group: &str, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM group_members
             WHERE course_id = ?1 AND group_name = ?2 AND user_id = ?3",
            params![course_id, group, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl EnrolmentControl for Database {
    fn set_suspended(&self, course_id: i64, user_id: i64, suspended: bool) -> Result<()> {
        let status = if suspended {
            StudentStatus::Suspended
        } else {
            StudentStatus::Active
        };
        self.set_status(course_id, user_id, status)?;
        if !suspended {
            // reinstatement also lifts the on-hold group membership
            self.remove_member(course_id, ONHOLD_GROUP, user_id)?;
        }
        Ok(())
    }
}

impl CourseStore for Database {
    fn subscribed_courses(&self) -> Result<Vec<Subscriber>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, shortname, subscribed, posting_wait_days, on_hold_period_days,
                    suspension_period_days, overdue_period_days
             FROM courses WHERE subscribed = 1 ORDER BY id",
        )?;
        let courses = stmt
            .query_map([], row_to_course)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(courses)
    }

    fn get_course(&self, course_id: i64) -> Result<Option<Subscriber>> {
        let course = self
            .conn
            .prepare(
                "SELECT id, shortname, subscribed, posting_wait_days, on_hold_period_days,
                        suspension_period_days, overdue_period_days
                 FROM courses WHERE id = ?1",
            )?
            .query_row(params![course_id], row_to_course)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(course)
    }

    fn students(&self, course_id: i64, status: Option<StudentStatus>) -> Result<Vec<Student>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, name, status, last_session_date, last_graded_date,
                    enrol_date, progress_flags
             FROM students WHERE course_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY id",
        )?;
        let students = stmt
            .query_map(params![course_id, status.map(|s| s.as_str())], row_to_student)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(students)
    }

    fn get_student(&self, course_id: i64, student_id: i64) -> Result<Option<Student>> {
        let student = self
            .conn
            .prepare(
                "SELECT id, course_id, name, status, last_session_date, last_graded_date,
                        enrol_date, progress_flags
                 FROM students WHERE course_id = ?1 AND id = ?2",
            )?
            .query_row(params![course_id, student_id], row_to_student)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(student)
    }

    fn instructors(&self, course_id: i64) -> Result<Vec<Instructor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, name, last_booked_date, senior
             FROM instructors WHERE course_id = ?1 ORDER BY id",
        )?;
        let instructors = stmt
            .query_map(params![course_id], row_to_instructor)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(instructors)
    }

    fn senior_instructor_ids(&self, course_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM instructors WHERE course_id = ?1 AND senior = 1 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![course_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)?;
        Ok(ids)
    }
}

impl NotificationDispatcher for Database {
    fn dispatch(&self, notification: Notification) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (id, kind, course_id, recipient_id, cc_ids, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                notification.id,
                notification.kind.as_str(),
                notification.course_id,
                notification.recipient_id,
                serde_json::to_string(&notification.cc_ids)?,
                notification.payload.to_string(),
                fmt(notification.created_at),
            ],
        )?;
        Ok(())
    }
}
