//! End-to-end sweep tests against an in-memory database.
//!
//! These exercise the full path: seeded course settings drive the
//! restriction deadlines, the sweep performs transitions and enqueues
//! notifications, and a same-day re-run stays idempotent.

use chrono::{Days, NaiveDate, TimeZone, Utc};

use flightbook_core::availability;
use flightbook_core::notify::NotificationKind;
use flightbook_core::storage::{BookingStore, CourseStore, SlotStore};
use flightbook_core::{
    Booking, Database, Instructor, ProgressRecord, RestrictionConfig, Student, StudentStatus,
    Subscriber, Sweep, TimeWindow,
};

const TODAY: (i32, u32, u32) = (2025, 6, 2); // a Monday

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).unwrap()
}

fn seed_course(db: &Database, config: RestrictionConfig) -> Subscriber {
    let course = Subscriber::new(1, "PPL", config);
    db.upsert_course(&course).unwrap();
    course
}

fn seed_student(db: &Database, id: i64, last_session_days_ago: u64) -> Student {
    let session_day = today() - Days::new(last_session_days_ago);
    let student = Student {
        id,
        course_id: 1,
        name: format!("Student {id}"),
        status: StudentStatus::Active,
        last_session_date: Some(Utc.from_utc_datetime(&session_day.and_hms_opt(14, 0, 0).unwrap())),
        last_graded_date: None,
        enrol_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        progress: ProgressRecord::default(),
    };
    db.upsert_student(&student).unwrap();
    student
}

fn seed_instructor(db: &Database, id: i64, last_booked_days_ago: Option<u64>, senior: bool) {
    let last_booked_date = last_booked_days_ago.map(|days| {
        let day = today() - Days::new(days);
        Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap())
    });
    db.upsert_instructor(&Instructor {
        id,
        course_id: 1,
        name: format!("Instructor {id}"),
        last_booked_date,
        senior,
    })
    .unwrap();
}

fn count_kind(db: &Database, kind: NotificationKind) -> usize {
    db.pending_notifications()
        .unwrap()
        .iter()
        .filter(|n| n.kind == kind)
        .count()
}

#[test]
fn inactive_student_lands_on_hold() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 7,
            on_hold_period_days: 30,
            suspension_period_days: 90,
            overdue_period_days: 0,
        },
    );
    seed_student(&db, 7, 37);

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.onhold_placements, 1);
    assert_eq!(report.onhold_warnings, 0); // warning day already passed
    assert_eq!(report.errors, 0);

    let student = db.get_student(1, 7).unwrap().unwrap();
    assert_eq!(student.status, StudentStatus::OnHold);
    assert_eq!(count_kind(&db, NotificationKind::OnholdPlacement), 1);
}

#[test]
fn sweep_rerun_same_day_is_idempotent() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 7,
            on_hold_period_days: 30,
            suspension_period_days: 90,
            overdue_period_days: 0,
        },
    );
    // warning day: anchor + 23 == today
    seed_student(&db, 7, 23);
    // placement day reached
    seed_student(&db, 8, 37);

    Sweep::at(&db, today()).execute().unwrap();
    Sweep::at(&db, today()).execute().unwrap();

    // the one-shot warning is gated by the progress stamp
    assert_eq!(count_kind(&db, NotificationKind::OnholdWarning), 1);
    // the placement path is gated by the one-way status change
    assert_eq!(count_kind(&db, NotificationKind::OnholdPlacement), 1);
}

#[test]
fn disabled_on_hold_restriction_never_fires() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 0,
            on_hold_period_days: 0,
            suspension_period_days: 90,
            overdue_period_days: 0,
        },
    );
    seed_student(&db, 7, 400);

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.onhold_placements, 0);
    let student = db.get_student(1, 7).unwrap().unwrap();
    assert_eq!(student.status, StudentStatus::Active);
}

#[test]
fn posted_availability_keeps_student_active() {
    let db = Database::open_memory().unwrap();
    let course = seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 0,
            on_hold_period_days: 30,
            suspension_period_days: 90,
            overdue_period_days: 0,
        },
    );
    let mut student = seed_student(&db, 7, 37);

    let start = Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap();
    let window = TimeWindow::new(start, start + chrono::Duration::hours(1)).unwrap();
    availability::post_week(&db, &db, &mut student, &course, 5, today(), 2025, 23, &[window])
        .unwrap();

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.onhold_placements, 0);
    assert_eq!(
        db.get_student(1, 7).unwrap().unwrap().status,
        StudentStatus::Active
    );
}

#[test]
fn on_hold_student_suspends_after_period() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 7,
            on_hold_period_days: 30,
            suspension_period_days: 90,
            overdue_period_days: 0,
        },
    );
    seed_instructor(&db, 99, None, true);
    let mut student = seed_student(&db, 7, 100);
    student.status = StudentStatus::OnHold;
    db.upsert_student(&student).unwrap();

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.suspensions, 1);
    assert_eq!(
        db.get_student(1, 7).unwrap().unwrap().status,
        StudentStatus::Suspended
    );
    // suspension notification carries the senior instructor copy
    let pending = db.pending_notifications().unwrap();
    let suspension = pending
        .iter()
        .find(|n| n.kind == NotificationKind::Suspension)
        .unwrap();
    assert_eq!(suspension.cc_ids, vec![99]);
}

#[test]
fn instructor_overdue_fires_with_retry_count() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 0,
            on_hold_period_days: 0,
            suspension_period_days: 0,
            overdue_period_days: 14,
        },
    );
    seed_instructor(&db, 5, Some(28), false);
    seed_instructor(&db, 6, Some(20), false);

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.overdue_notifications, 1);
    let pending = db.pending_notifications().unwrap();
    let overdue = pending
        .iter()
        .find(|n| n.kind == NotificationKind::SessionOverdue)
        .unwrap();
    assert_eq!(overdue.recipient_id, 5);
    assert_eq!(overdue.payload["retry"], 2);
    assert_eq!(overdue.payload["days_since_last"], 28);
}

#[test]
fn two_noshow_student_reinstated_after_fixed_period() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 0,
            on_hold_period_days: 0,
            suspension_period_days: 0,
            overdue_period_days: 0,
        },
    );
    let mut student = seed_student(&db, 7, 60);

    // two no-show bookings, the first more than the fixed period ago
    for (week, day) in [(18u32, 1u32), (20, 15)] {
        let start = Utc.with_ymd_and_hms(2025, 5, day, 9, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + chrono::Duration::hours(1)).unwrap();
        let ids = db.replace_week(1, 7, 2025, week, &[window]).unwrap();
        let slot = db.get_slot(ids[0]).unwrap().unwrap();
        let booking_id = db.create_booking(&Booking::request(1, 42, 7, 5, slot)).unwrap();
        db.set_booking_inactive(booking_id, true).unwrap();
    }

    student.status = StudentStatus::Suspended;
    db.upsert_student(&student).unwrap();

    let report = Sweep::at(&db, today()).execute().unwrap();

    assert_eq!(report.reinstatements, 1);
    assert_eq!(
        db.get_student(1, 7).unwrap().unwrap().status,
        StudentStatus::Active
    );
    assert_eq!(count_kind(&db, NotificationKind::NoshowReinstatement), 1);

    // a second sweep has nothing left to reinstate
    let report = Sweep::at(&db, today()).execute().unwrap();
    assert_eq!(report.reinstatements, 0);
}

#[test]
fn posting_digest_drains_after_one_sweep() {
    let db = Database::open_memory().unwrap();
    let course = seed_course(
        &db,
        RestrictionConfig {
            posting_wait_days: 0,
            on_hold_period_days: 0,
            suspension_period_days: 0,
            overdue_period_days: 0,
        },
    );
    seed_instructor(&db, 99, None, true);
    let mut student = seed_student(&db, 7, 1);

    let start = Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap();
    let window = TimeWindow::new(start, start + chrono::Duration::hours(1)).unwrap();
    availability::post_week(&db, &db, &mut student, &course, 5, today(), 2025, 23, &[window])
        .unwrap();

    Sweep::at(&db, today()).execute().unwrap();
    assert_eq!(count_kind(&db, NotificationKind::PostingDigest), 1);

    // flag drained: the next sweep stays quiet
    Sweep::at(&db, today()).execute().unwrap();
    assert_eq!(count_kind(&db, NotificationKind::PostingDigest), 1);
}

#[test]
fn graduation_notification_clears_its_flag() {
    let db = Database::open_memory().unwrap();
    seed_course(
        &db,
        RestrictionConfig::default(),
    );
    seed_instructor(&db, 99, None, true);
    let mut student = seed_student(&db, 7, 1);
    student.status = StudentStatus::Graduated;
    student.progress.set_graduation_notification_pending(true);
    db.upsert_student(&student).unwrap();

    Sweep::at(&db, today()).execute().unwrap();
    assert_eq!(count_kind(&db, NotificationKind::Graduation), 1);

    Sweep::at(&db, today()).execute().unwrap();
    assert_eq!(count_kind(&db, NotificationKind::Graduation), 1);
}

#[test]
fn week_view_lanes_across_students() {
    let db = Database::open_memory().unwrap();
    seed_course(&db, RestrictionConfig::default());
    seed_student(&db, 7, 1);
    seed_student(&db, 8, 1);

    // two students overlap on Monday; two lanes
    let monday = |h: u32| Utc.with_ymd_and_hms(2025, 6, 2, h, 0, 0).unwrap();
    let w1 = TimeWindow::new(monday(9), monday(10)).unwrap();
    let w2 = TimeWindow::new(
        monday(9) + chrono::Duration::minutes(30),
        monday(10) + chrono::Duration::minutes(30),
    )
    .unwrap();
    db.replace_week(1, 7, 2025, 23, &[w1]).unwrap();
    db.replace_week(1, 8, 2025, 23, &[w2]).unwrap();

    let lanes = availability::week_lanes(&db, 1, 2025, 23).unwrap();
    assert_eq!(lanes.max_lanes(), 2);
    assert_eq!(
        lanes
            .day(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
            .len(),
        2
    );
}
