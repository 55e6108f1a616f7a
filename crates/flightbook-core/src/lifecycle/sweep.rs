//! The daily batch sweep.
//!
//! Single-threaded, single-pass: iterates every subscribed course, then
//! every student and instructor of each, delegating decisions to the
//! [`LifecycleEngine`](super::LifecycleEngine). One participant's
//! failure never aborts the sweep; errors are logged per participant
//! and counted in the report. Overlapping sweeps against the same
//! course must be excluded by the job scheduler.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, info_span, warn};

use super::{LifecycleEngine, TickOutcome};
use crate::error::Result;
use crate::notify::NotificationDispatcher;
use crate::participant::{Student, StudentStanding, StudentStatus};
use crate::storage::{BookingStore, CourseStore, ProgressStore, SlotStore, Store};
use crate::subscriber::Subscriber;

/// Aggregated counters for one sweep run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub courses: usize,
    pub students_evaluated: usize,
    pub instructors_evaluated: usize,
    pub onhold_warnings: usize,
    pub onhold_placements: usize,
    pub suspensions: usize,
    pub inactive_warnings: usize,
    pub overdue_notifications: usize,
    pub reinstatements: usize,
    pub posting_digests: usize,
    pub graduation_notifications: usize,
    pub errors: usize,
}

impl SweepReport {
    fn absorb(&mut self, outcomes: &[TickOutcome]) {
        for outcome in outcomes {
            match outcome {
                TickOutcome::OnholdWarned => self.onhold_warnings += 1,
                TickOutcome::PlacedOnhold => self.onhold_placements += 1,
                TickOutcome::Suspended => self.suspensions += 1,
                TickOutcome::InactiveWarned => self.inactive_warnings += 1,
                TickOutcome::OverdueNotified { .. } => self.overdue_notifications += 1,
                TickOutcome::Reinstated => self.reinstatements += 1,
            }
        }
    }
}

/// The cron entry point: `execute()` takes no arguments and reads all
/// configuration from the persisted course settings at invocation time.
pub struct Sweep<'a, S: Store> {
    store: &'a S,
    today: NaiveDate,
}

impl<'a, S: Store> Sweep<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the sweep day (tests, backfills).
    pub fn at(store: &'a S, today: NaiveDate) -> Self {
        Self { store, today }
    }

    /// Run one full sweep across all subscribed courses.
    pub fn execute(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for course in self.store.subscribed_courses()? {
            let span = info_span!("sweep", course = %course.shortname, day = %self.today);
            let _guard = span.enter();

            info!(
                restrictions_enabled = course.config.any_enabled(),
                "evaluating course"
            );
            report.courses += 1;
            self.sweep_course(&course, &mut report);
        }

        info!(
            courses = report.courses,
            students = report.students_evaluated,
            errors = report.errors,
            "sweep finished"
        );
        Ok(report)
    }

    fn sweep_course(&self, course: &Subscriber, report: &mut SweepReport) {
        let seniors = match self.store.senior_instructor_ids(course.id) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to load senior instructors");
                report.errors += 1;
                Vec::new()
            }
        };

        let engine = LifecycleEngine::new(
            course,
            self.store,
            self.store,
            self.store,
            self.store,
            seniors.clone(),
            self.today,
        );

        // restriction ladder over active and on-hold students
        if course.config.student_restrictions_enabled() {
            for mut student in self.load_students(course, report) {
                report.students_evaluated += 1;
                match self
                    .assemble_standing(course, &engine, &student)
                    .and_then(|standing| engine.evaluate_student(&mut student, &standing))
                {
                    Ok(outcomes) => report.absorb(&outcomes),
                    Err(e) => {
                        warn!(student = student.id, error = %e, "student evaluation failed");
                        report.errors += 1;
                    }
                }
            }
        }

        // no-show reinstatement runs regardless of restriction config
        for mut student in self.load_by_status(course, StudentStatus::Suspended, report) {
            match self
                .store
                .noshow_bookings(course.id, student.id)
                .and_then(|noshows| engine.evaluate_reinstatement(&mut student, &noshows))
            {
                Ok(Some(outcome)) => report.absorb(&[outcome]),
                Ok(None) => {}
                Err(e) => {
                    warn!(student = student.id, error = %e, "reinstatement check failed");
                    report.errors += 1;
                }
            }
        }

        // instructor overdue cadence
        if course.config.overdue_period_days > 0 {
            match self.store.instructors(course.id) {
                Ok(instructors) => {
                    for instructor in instructors {
                        report.instructors_evaluated += 1;
                        match engine.evaluate_instructor(&instructor) {
                            Ok(Some(outcome)) => report.absorb(&[outcome]),
                            Ok(None) => {}
                            Err(e) => {
                                warn!(instructor = instructor.id, error = %e, "instructor evaluation failed");
                                report.errors += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to load instructors");
                    report.errors += 1;
                }
            }
        }

        // notification passes: posting digests and graduations
        for mut student in self.load_students(course, report) {
            if let Err(e) = self.process_posting_digest(course, &seniors, &mut student, report) {
                warn!(student = student.id, error = %e, "posting digest failed");
                report.errors += 1;
            }
        }
        for mut student in self.load_by_status(course, StudentStatus::Graduated, report) {
            if let Err(e) = self.process_graduation(course, &seniors, &mut student, report) {
                warn!(student = student.id, error = %e, "graduation notification failed");
                report.errors += 1;
            }
        }
    }

    /// Active plus on-hold students: both stay under evaluation until
    /// suspended or graduated.
    fn load_students(&self, course: &Subscriber, report: &mut SweepReport) -> Vec<Student> {
        let mut students = self.load_by_status(course, StudentStatus::Active, report);
        students.extend(self.load_by_status(course, StudentStatus::OnHold, report));
        students
    }

    fn load_by_status(
        &self,
        course: &Subscriber,
        status: StudentStatus,
        report: &mut SweepReport,
    ) -> Vec<Student> {
        match self.store.students(course.id, Some(status)) {
            Ok(students) => students,
            Err(e) => {
                warn!(error = %e, status = status.as_str(), "failed to load students");
                report.errors += 1;
                Vec::new()
            }
        }
    }

    fn assemble_standing(
        &self,
        course: &Subscriber,
        engine: &LifecycleEngine<'_>,
        student: &Student,
    ) -> Result<StudentStanding> {
        Ok(StudentStanding {
            valid_posts: self
                .store
                .valid_post_count(course.id, student.id, self.today)?,
            active_posts: self.store.active_post_count(course.id, student.id)?,
            has_active_booking: self.store.active_booking(course.id, student.id)?.is_some(),
            kept_active: engine.is_kept_active(student.id)?,
        })
    }

    /// Drain the student's posted-slot accumulator into one digest per
    /// senior instructor. Draining first makes a re-run harmless.
    fn process_posting_digest(
        &self,
        course: &Subscriber,
        seniors: &[i64],
        student: &mut Student,
        report: &mut SweepReport,
    ) -> Result<()> {
        let pending = student.progress.pending_posted_slots();
        if pending.is_empty() {
            return Ok(());
        }

        let mut postings = Vec::new();
        for slot_id in &pending {
            if let Some(slot) = self.store.get_slot(*slot_id)? {
                postings.push(json!({
                    "start": slot.window.start(),
                    "end": slot.window.end(),
                }));
            }
        }

        student.progress.clear_posted_slots();
        self.store
            .save_progress(course.id, student.id, &student.progress)?;

        if postings.is_empty() {
            return Ok(());
        }
        for senior in seniors {
            self.store.send_posting_digest(
                course.id,
                *senior,
                student.id,
                json!(postings),
            )?;
            report.posting_digests += 1;
        }
        Ok(())
    }

    fn process_graduation(
        &self,
        course: &Subscriber,
        seniors: &[i64],
        student: &mut Student,
        report: &mut SweepReport,
    ) -> Result<()> {
        if !student.progress.graduation_notification_pending() {
            return Ok(());
        }

        student.progress.set_graduation_notification_pending(false);
        self.store
            .save_progress(course.id, student.id, &student.progress)?;

        self.store
            .send_graduation_notification(course.id, student.id, seniors.to_vec())?;
        report.graduation_notifications += 1;
        Ok(())
    }
}
