//! Notification decisions and the dispatcher seam.
//!
//! This module decides *when* and *to whom* a notification fires; the
//! delivery mechanics (mail, push) belong to whatever drains the queue.
//! Each lifecycle event maps to one [`NotificationKind`]; one-shot kinds
//! are deduplicated per student per day through the progress record
//! (see [`crate::participant::ProgressRecord`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;

/// Every notification the lifecycle engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OnholdWarning,
    OnholdPlacement,
    Suspension,
    InactiveWarning,
    SessionOverdue,
    NoshowReinstatement,
    PostingDigest,
    Graduation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnholdWarning => "onhold_warning",
            Self::OnholdPlacement => "onhold_placement",
            Self::Suspension => "suspension",
            Self::InactiveWarning => "inactive_warning",
            Self::SessionOverdue => "session_overdue",
            Self::NoshowReinstatement => "noshow_reinstatement",
            Self::PostingDigest => "posting_digest",
            Self::Graduation => "graduation",
        }
    }

    /// One-shot kinds fire on an exact calendar-day match and are
    /// gated so a re-run sweep cannot double-send them.
    pub fn is_one_shot(&self) -> bool {
        matches!(self, Self::OnholdWarning | Self::InactiveWarning)
    }
}

/// A queued notification: the decision, not the delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub course_id: i64,
    pub recipient_id: i64,
    /// Secondary recipients (senior instructors on lifecycle events).
    pub cc_ids: Vec<i64>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        course_id: i64,
        recipient_id: i64,
        cc_ids: Vec<i64>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            course_id,
            recipient_id,
            cc_ids,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Dispatcher seam: one call per notification kind.
///
/// Implementations enqueue; they must tolerate at-least-once delivery
/// from the sweep. A committed state transition is never rolled back
/// because a dispatch failed.
pub trait NotificationDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<()>;

    fn send_onhold_warning(
        &self,
        course_id: i64,
        student_id: i64,
        onhold_date: NaiveDate,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::OnholdWarning,
            course_id,
            student_id,
            Vec::new(),
            json!({ "onhold_date": onhold_date }),
        ))
    }

    fn send_onhold_notification(
        &self,
        course_id: i64,
        student_id: i64,
        last_activity: Option<NaiveDate>,
        suspend_date: Option<NaiveDate>,
        cc_ids: Vec<i64>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::OnholdPlacement,
            course_id,
            student_id,
            cc_ids,
            json!({ "last_activity": last_activity, "suspend_date": suspend_date }),
        ))
    }

    fn send_suspension_notification(
        &self,
        course_id: i64,
        student_id: i64,
        last_activity: Option<NaiveDate>,
        cc_ids: Vec<i64>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::Suspension,
            course_id,
            student_id,
            cc_ids,
            json!({ "last_activity": last_activity }),
        ))
    }

    fn send_inactive_warning(
        &self,
        course_id: i64,
        student_id: i64,
        last_session: Option<NaiveDate>,
        onhold_date: Option<NaiveDate>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::InactiveWarning,
            course_id,
            student_id,
            Vec::new(),
            json!({ "last_session": last_session, "onhold_date": onhold_date }),
        ))
    }

    fn send_session_overdue_notification(
        &self,
        course_id: i64,
        instructor_id: i64,
        days_since_last: i64,
        retry: i64,
        cc_ids: Vec<i64>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::SessionOverdue,
            course_id,
            instructor_id,
            cc_ids,
            json!({ "days_since_last": days_since_last, "retry": retry }),
        ))
    }

    fn send_noshow_reinstatement_notification(
        &self,
        course_id: i64,
        student_id: i64,
        exercise_id: i64,
        cc_ids: Vec<i64>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::NoshowReinstatement,
            course_id,
            student_id,
            cc_ids,
            json!({ "exercise_id": exercise_id }),
        ))
    }

    fn send_posting_digest(
        &self,
        course_id: i64,
        instructor_id: i64,
        student_id: i64,
        postings: serde_json::Value,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::PostingDigest,
            course_id,
            instructor_id,
            Vec::new(),
            json!({ "student_id": student_id, "postings": postings }),
        ))
    }

    fn send_graduation_notification(
        &self,
        course_id: i64,
        student_id: i64,
        cc_ids: Vec<i64>,
    ) -> Result<()> {
        self.dispatch(Notification::new(
            NotificationKind::Graduation,
            course_id,
            student_id,
            cc_ids,
            json!({}),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records every dispatched notification for assertions.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub sent: RefCell<Vec<Notification>>,
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn dispatch(&self, notification: Notification) -> Result<()> {
            self.sent.borrow_mut().push(notification);
            Ok(())
        }
    }

    impl RecordingDispatcher {
        pub fn count_of(&self, kind: NotificationKind) -> usize {
            self.sent.borrow().iter().filter(|n| n.kind == kind).count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::RecordingDispatcher;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(NotificationKind::OnholdWarning.as_str(), "onhold_warning");
        assert_eq!(NotificationKind::PostingDigest.as_str(), "posting_digest");
    }

    #[test]
    fn one_shot_kinds() {
        assert!(NotificationKind::OnholdWarning.is_one_shot());
        assert!(NotificationKind::InactiveWarning.is_one_shot());
        assert!(!NotificationKind::Suspension.is_one_shot());
    }

    #[test]
    fn default_methods_build_payloads() {
        let dispatcher = RecordingDispatcher::default();
        dispatcher
            .send_session_overdue_notification(1, 9, 28, 2, vec![3])
            .unwrap();

        let sent = dispatcher.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::SessionOverdue);
        assert_eq!(sent[0].payload["retry"], 2);
        assert_eq!(sent[0].cc_ids, vec![3]);
    }
}
