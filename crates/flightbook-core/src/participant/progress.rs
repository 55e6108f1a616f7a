//! Per-student progress record: durable flags plus notification gates.
//!
//! The record persists as one JSON object per student/course row. Keys
//! are drawn from a closed set ([`ProgressFlag`]) with typed accessors;
//! unrecognized keys already present in a stored row are carried through
//! untouched on rewrite.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::notify::NotificationKind;

/// Recognized progress-record keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressFlag {
    /// Wait-restriction waiver: student may post regardless of the
    /// posting-wait period.
    PostingWaiver,
    /// Comma list of slot ids awaiting the instructor posting digest.
    NotifyPostedSlots,
    /// Graduation notification pending.
    NotifyGraduation,
    /// Examiner endorsement record (opaque JSON).
    Endorsement,
    /// All ground lessons completed.
    LessonsComplete,
}

impl ProgressFlag {
    pub fn key(&self) -> &'static str {
        match self {
            Self::PostingWaiver => "postingwaiver",
            Self::NotifyPostedSlots => "notifypostedslots",
            Self::NotifyGraduation => "notifygraduation",
            Self::Endorsement => "endorsement",
            Self::LessonsComplete => "lessonscomplete",
        }
    }
}

/// Typed view over a student's persisted flag map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressRecord {
    flags: Map<String, Value>,
}

impl ProgressRecord {
    /// Parse the stored JSON object; empty or invalid input yields an
    /// empty record rather than an error (legacy rows may hold junk).
    pub fn from_json(raw: &str) -> Self {
        let flags = serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        Self { flags }
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.flags.clone()).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn get(&self, flag: ProgressFlag) -> Option<&Value> {
        self.flags.get(flag.key())
    }

    fn set(&mut self, flag: ProgressFlag, value: Value) {
        self.flags.insert(flag.key().to_string(), value);
    }

    fn clear(&mut self, flag: ProgressFlag) {
        self.flags.remove(flag.key());
    }

    // ── Durable flags ────────────────────────────────────────────────

    pub fn has_posting_waiver(&self) -> bool {
        self.get(ProgressFlag::PostingWaiver)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_posting_waiver(&mut self, waived: bool) {
        if waived {
            self.set(ProgressFlag::PostingWaiver, Value::Bool(true));
        } else {
            self.clear(ProgressFlag::PostingWaiver);
        }
    }

    pub fn lessons_complete(&self) -> bool {
        self.get(ProgressFlag::LessonsComplete)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_lessons_complete(&mut self, complete: bool) {
        self.set(ProgressFlag::LessonsComplete, Value::Bool(complete));
    }

    pub fn graduation_notification_pending(&self) -> bool {
        self.get(ProgressFlag::NotifyGraduation)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_graduation_notification_pending(&mut self, pending: bool) {
        if pending {
            self.set(ProgressFlag::NotifyGraduation, Value::Bool(true));
        } else {
            self.clear(ProgressFlag::NotifyGraduation);
        }
    }

    pub fn endorsement(&self) -> Option<&Value> {
        self.get(ProgressFlag::Endorsement)
    }

    pub fn set_endorsement(&mut self, endorsement: Value) {
        self.set(ProgressFlag::Endorsement, endorsement);
    }

    // ── Posting digest accumulator ───────────────────────────────────

    /// Slot ids awaiting the instructor posting digest.
    pub fn pending_posted_slots(&self) -> Vec<i64> {
        self.get(ProgressFlag::NotifyPostedSlots)
            .and_then(Value::as_str)
            .map(|s| s.split(',').filter_map(|id| id.parse().ok()).collect())
            .unwrap_or_default()
    }

    /// Append newly posted slot ids to the digest accumulator.
    pub fn append_posted_slots(&mut self, slot_ids: &[i64]) {
        let mut ids = self.pending_posted_slots();
        ids.extend_from_slice(slot_ids);
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.set(ProgressFlag::NotifyPostedSlots, Value::String(joined));
    }

    /// Drain the digest accumulator once the digest was enqueued.
    pub fn clear_posted_slots(&mut self) {
        self.clear(ProgressFlag::NotifyPostedSlots);
    }

    // ── Notification gate ────────────────────────────────────────────

    fn gate_key(kind: NotificationKind) -> String {
        format!("sent.{}", kind.as_str())
    }

    /// The day a one-shot notification kind last fired, if any.
    pub fn last_sent(&self, kind: NotificationKind) -> Option<NaiveDate> {
        self.flags
            .get(&Self::gate_key(kind))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Whether `kind` already fired on `today`; the daily sweep is safe
    /// to re-run against this check.
    pub fn already_sent(&self, kind: NotificationKind, today: NaiveDate) -> bool {
        self.last_sent(kind) == Some(today)
    }

    /// Record that `kind` fired on `today`.
    pub fn record_sent(&mut self, kind: NotificationKind, today: NaiveDate) {
        self.flags
            .insert(Self::gate_key(kind), Value::String(today.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_invalid_input_yield_empty_record() {
        assert!(ProgressRecord::from_json("").is_empty());
        assert!(ProgressRecord::from_json("not json").is_empty());
        assert!(ProgressRecord::from_json("[1,2]").is_empty());
    }

    #[test]
    fn unknown_keys_survive_rewrite() {
        let mut record = ProgressRecord::from_json(r#"{"legacykey": 42}"#);
        record.set_posting_waiver(true);
        let rewritten = ProgressRecord::from_json(&record.to_json());
        assert_eq!(
            rewritten.flags.get("legacykey"),
            Some(&Value::Number(42.into()))
        );
        assert!(rewritten.has_posting_waiver());
    }

    #[test]
    fn posted_slots_accumulate_and_drain() {
        let mut record = ProgressRecord::default();
        record.append_posted_slots(&[11, 12]);
        record.append_posted_slots(&[13]);
        assert_eq!(record.pending_posted_slots(), vec![11, 12, 13]);

        record.clear_posted_slots();
        assert!(record.pending_posted_slots().is_empty());
    }

    #[test]
    fn gate_blocks_same_day_resend() {
        let mut record = ProgressRecord::default();
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        assert!(!record.already_sent(NotificationKind::OnholdWarning, today));
        record.record_sent(NotificationKind::OnholdWarning, today);
        assert!(record.already_sent(NotificationKind::OnholdWarning, today));

        // a later day is a fresh gate
        let tomorrow = today.succ_opt().unwrap();
        assert!(!record.already_sent(NotificationKind::OnholdWarning, tomorrow));
    }
}
