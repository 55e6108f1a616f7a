//! Lifecycle restriction engine.
//!
//! Evaluates one student or instructor against the course restriction
//! deadlines for "today" and performs the due transition: warning,
//! on-hold placement, suspension, no-show reinstatement, or the
//! periodic instructor overdue reminder. Transitions are computed
//! deadlines, not externally triggered events; the daily sweep
//! (see [`sweep`]) drives this engine over every participant.
//!
//! ## State transitions
//!
//! ```text
//! active -> onhold -> suspended        (forward, by inactivity)
//! onhold -> active                     (renewed activity, outside the sweep)
//! suspended -> active                  (two-no-show reinstatement timer)
//! graduated                            (terminal)
//! ```

pub mod sweep;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::config::{
    KEEP_ACTIVE_GROUP, NOSHOW_REINSTATEMENT_COUNT, NOSHOW_SUSPENSION_DAYS, ONHOLD_GROUP,
};
use crate::error::Result;
use crate::notify::{NotificationDispatcher, NotificationKind};
use crate::participant::{Instructor, Student, StudentStanding, StudentStatus};
use crate::policy::{evaluate, wait_anchor};
use crate::storage::{EnrolmentControl, GroupMembership, ProgressStore};
use crate::subscriber::Subscriber;

/// What one evaluation tick did for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    OnholdWarned,
    PlacedOnhold,
    Suspended,
    InactiveWarned,
    OverdueNotified { retry: i64 },
    Reinstated,
}

/// Evaluates participants of one course for one sweep day.
pub struct LifecycleEngine<'a> {
    course: &'a Subscriber,
    groups: &'a dyn GroupMembership,
    enrolment: &'a dyn EnrolmentControl,
    progress: &'a dyn ProgressStore,
    dispatcher: &'a dyn NotificationDispatcher,
    /// Senior instructors carbon-copied on lifecycle events.
    senior_ids: Vec<i64>,
    today: NaiveDate,
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(
        course: &'a Subscriber,
        groups: &'a dyn GroupMembership,
        enrolment: &'a dyn EnrolmentControl,
        progress: &'a dyn ProgressStore,
        dispatcher: &'a dyn NotificationDispatcher,
        senior_ids: Vec<i64>,
        today: NaiveDate,
    ) -> Self {
        Self {
            course,
            groups,
            enrolment,
            progress,
            dispatcher,
            senior_ids,
            today,
        }
    }

    /// Evaluate one student for this sweep day.
    ///
    /// On-hold entry is one-way idempotent: a student already on hold
    /// is only checked for suspension, never re-evaluated for on-hold
    /// placement or warnings.
    pub fn evaluate_student(
        &self,
        student: &mut Student,
        standing: &StudentStanding,
    ) -> Result<Vec<TickOutcome>> {
        let mut outcomes = Vec::new();
        let anchor = wait_anchor(student);
        let deadlines = evaluate(&self.course.config, anchor);
        let exempt = standing.kept_active || student.progress.has_posting_waiver();

        if student.is_on_hold() {
            if deadlines.suspend.reached(self.today) && !exempt {
                self.suspend(student, anchor)?;
                outcomes.push(TickOutcome::Suspended);
            }
            return Ok(outcomes);
        }

        // inactivity warning runs independently of the on-hold ladder
        if deadlines.posting_overdue_warning.is_on(self.today)
            && !standing.has_active_booking
            && standing.valid_posts == 0
            && self.pass_gate(student, NotificationKind::InactiveWarning)?
        {
            self.dispatcher.send_inactive_warning(
                self.course.id,
                student.id,
                student.last_session_day(),
                deadlines.on_hold.date(),
            )?;
            outcomes.push(TickOutcome::InactiveWarned);
        }

        if exempt {
            return Ok(outcomes);
        }

        // heads-up exactly one week ahead of placement
        if deadlines.on_hold_warning.is_on(self.today)
            && !standing.has_active_booking
            && standing.active_posts == 0
            && self.pass_gate(student, NotificationKind::OnholdWarning)?
        {
            self.dispatcher.send_onhold_warning(
                self.course.id,
                student.id,
                deadlines.on_hold.date().unwrap_or(self.today),
            )?;
            outcomes.push(TickOutcome::OnholdWarned);
        }

        if deadlines.on_hold.reached(self.today) && !standing.keeps_active() {
            self.groups
                .add_member(self.course.id, ONHOLD_GROUP, student.id)?;
            self.progress
                .set_status(self.course.id, student.id, StudentStatus::OnHold)?;
            student.status = StudentStatus::OnHold;

            self.dispatcher.send_onhold_notification(
                self.course.id,
                student.id,
                Some(anchor),
                deadlines.suspend.date(),
                self.senior_ids.clone(),
            )?;
            outcomes.push(TickOutcome::PlacedOnhold);
        }

        Ok(outcomes)
    }

    /// Reinstate a suspended student whose two-no-show suspension
    /// period has elapsed. The timer runs from the first no-show
    /// session, separate from the course suspension timer.
    pub fn evaluate_reinstatement(
        &self,
        student: &mut Student,
        noshows: &[Booking],
    ) -> Result<Option<TickOutcome>> {
        if noshows.len() != NOSHOW_REINSTATEMENT_COUNT {
            return Ok(None);
        }

        let first = &noshows[0];
        let until =
            first.slot.window.start().date_naive() + chrono::Days::new(NOSHOW_SUSPENSION_DAYS as u64);
        if self.today < until {
            return Ok(None);
        }

        self.enrolment
            .set_suspended(self.course.id, student.id, false)?;
        student.status = StudentStatus::Active;

        self.dispatcher.send_noshow_reinstatement_notification(
            self.course.id,
            student.id,
            first.exercise_id,
            self.senior_ids.clone(),
        )?;
        Ok(Some(TickOutcome::Reinstated))
    }

    /// Periodic instructor overdue reminder: fires every time the days
    /// since the last booking hit an exact positive multiple of the
    /// overdue period, so reminders repeat at a fixed cadence.
    pub fn evaluate_instructor(&self, instructor: &Instructor) -> Result<Option<TickOutcome>> {
        let period = i64::from(self.course.config.overdue_period_days);
        if period == 0 {
            return Ok(None);
        }
        let Some(last) = instructor.last_booked_day() else {
            return Ok(None);
        };

        let days_since = (self.today - last).num_days();
        if days_since >= period && days_since % period == 0 {
            let retry = days_since / period;
            self.dispatcher.send_session_overdue_notification(
                self.course.id,
                instructor.id,
                days_since,
                retry,
                self.senior_ids.clone(),
            )?;
            return Ok(Some(TickOutcome::OverdueNotified { retry }));
        }
        Ok(None)
    }

    /// Whether the student counts as kept active by group membership.
    pub fn is_kept_active(&self, student_id: i64) -> Result<bool> {
        self.groups
            .is_member(self.course.id, KEEP_ACTIVE_GROUP, student_id)
    }

    fn suspend(&self, student: &mut Student, anchor: NaiveDate) -> Result<()> {
        self.enrolment
            .set_suspended(self.course.id, student.id, true)?;
        student.status = StudentStatus::Suspended;
        self.dispatcher.send_suspension_notification(
            self.course.id,
            student.id,
            Some(anchor),
            self.senior_ids.clone(),
        )
    }

    /// One-shot gate: returns true when the kind has not fired for this
    /// student today, recording the stamp so a re-run sweep is a no-op.
    fn pass_gate(&self, student: &mut Student, kind: NotificationKind) -> Result<bool> {
        if student.progress.already_sent(kind, self.today) {
            return Ok(false);
        }
        student.progress.record_sent(kind, self.today);
        self.progress
            .save_progress(self.course.id, student.id, &student.progress)?;
        Ok(true)
    }
}
