//! Deadline arithmetic for course inactivity restrictions.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{ON_HOLD_WARNING_LEAD_DAYS, OVERDUE_GRACE_DAYS};

/// Per-course restriction periods, in days. A value of 0 disables the
/// corresponding restriction entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    /// Days a student waits after a session before posting again.
    #[serde(default)]
    pub posting_wait_days: u32,
    /// Days of inactivity before on-hold placement.
    #[serde(default)]
    pub on_hold_period_days: u32,
    /// Days of inactivity before enrolment suspension.
    #[serde(default)]
    pub suspension_period_days: u32,
    /// Cadence for repeating instructor overdue reminders.
    #[serde(default)]
    pub overdue_period_days: u32,
}

impl RestrictionConfig {
    /// Whether any student restriction is live.
    pub fn student_restrictions_enabled(&self) -> bool {
        self.on_hold_period_days > 0 || self.suspension_period_days > 0
    }

    pub fn any_enabled(&self) -> bool {
        self.student_restrictions_enabled()
            || self.posting_wait_days > 0
            || self.overdue_period_days > 0
    }
}

/// A computed deadline; `Never` is non-actionable and compares greater
/// than every concrete day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deadline {
    Never,
    On(NaiveDate),
}

impl Deadline {
    fn from_anchor(anchor: NaiveDate, period_days: u32) -> Self {
        if period_days == 0 {
            Self::Never
        } else {
            Self::On(anchor + Days::new(u64::from(period_days)))
        }
    }

    /// The deadline has arrived or passed.
    pub fn reached(&self, today: NaiveDate) -> bool {
        match self {
            Self::Never => false,
            Self::On(day) => today >= *day,
        }
    }

    /// Exact calendar-day match, used for one-shot warnings.
    pub fn is_on(&self, today: NaiveDate) -> bool {
        matches!(self, Self::On(day) if *day == today)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Never => None,
            Self::On(day) => Some(*day),
        }
    }

    fn minus_days(&self, days: i64) -> Self {
        match self {
            Self::Never => Self::Never,
            Self::On(day) => Self::On(*day - Days::new(days.unsigned_abs())),
        }
    }
}

/// The full set of deadline dates for one student's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    /// Inactivity warning: anchor + posting wait + grace.
    pub posting_overdue_warning: Deadline,
    /// Heads-up one week before on-hold placement.
    pub on_hold_warning: Deadline,
    /// On-hold placement day.
    pub on_hold: Deadline,
    /// Enrolment suspension day.
    pub suspend: Deadline,
}

/// Map course config and a wait anchor to concrete deadline dates.
///
/// Pure: no clock access, no side effects. Monotonic non-decreasing in
/// `anchor` for a fixed config.
pub fn evaluate(config: &RestrictionConfig, anchor: NaiveDate) -> Deadlines {
    let posting_overdue_warning = if config.posting_wait_days == 0 {
        Deadline::Never
    } else {
        Deadline::On(
            anchor + Days::new(u64::from(config.posting_wait_days) + OVERDUE_GRACE_DAYS as u64),
        )
    };

    let on_hold = Deadline::from_anchor(anchor, config.on_hold_period_days);

    Deadlines {
        posting_overdue_warning,
        on_hold_warning: on_hold.minus_days(ON_HOLD_WARNING_LEAD_DAYS),
        on_hold,
        suspend: Deadline::from_anchor(anchor, config.suspension_period_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(wait: u32, onhold: u32, suspend: u32) -> RestrictionConfig {
        RestrictionConfig {
            posting_wait_days: wait,
            on_hold_period_days: onhold,
            suspension_period_days: suspend,
            overdue_period_days: 0,
        }
    }

    #[test]
    fn deadlines_offset_from_anchor() {
        let deadlines = evaluate(&config(7, 30, 90), day(2025, 5, 1));
        assert_eq!(
            deadlines.posting_overdue_warning,
            Deadline::On(day(2025, 5, 15)) // 7 wait + 7 grace
        );
        assert_eq!(deadlines.on_hold, Deadline::On(day(2025, 5, 31)));
        assert_eq!(deadlines.on_hold_warning, Deadline::On(day(2025, 5, 24)));
        assert_eq!(deadlines.suspend, Deadline::On(day(2025, 7, 30)));
    }

    #[test]
    fn zero_period_disables() {
        let deadlines = evaluate(&config(0, 0, 0), day(2025, 5, 1));
        assert_eq!(deadlines.posting_overdue_warning, Deadline::Never);
        assert_eq!(deadlines.on_hold, Deadline::Never);
        assert_eq!(deadlines.on_hold_warning, Deadline::Never);
        assert_eq!(deadlines.suspend, Deadline::Never);

        // Never is never actionable
        assert!(!Deadline::Never.reached(day(2100, 1, 1)));
        assert!(!Deadline::Never.is_on(day(2100, 1, 1)));
    }

    #[test]
    fn anchor_crossing_new_year() {
        let deadlines = evaluate(&config(0, 30, 0), day(2024, 12, 20));
        assert_eq!(deadlines.on_hold, Deadline::On(day(2025, 1, 19)));
        assert!(deadlines.on_hold.reached(day(2025, 1, 19)));
        assert!(!deadlines.on_hold.reached(day(2025, 1, 18)));
    }

    proptest! {
        #[test]
        fn deadlines_monotonic_in_anchor(
            offset in 0u64..2000,
            shift in 0u64..200,
            wait in 0u32..120,
            onhold in 0u32..365,
            suspendd in 0u32..730,
        ) {
            let base = day(2020, 1, 1) + Days::new(offset);
            let later = base + Days::new(shift);
            let cfg = config(wait, onhold, suspendd);

            let a = evaluate(&cfg, base);
            let b = evaluate(&cfg, later);

            // moving the anchor forward never moves a deadline earlier
            for (x, y) in [
                (a.posting_overdue_warning, b.posting_overdue_warning),
                (a.on_hold_warning, b.on_hold_warning),
                (a.on_hold, b.on_hold),
                (a.suspend, b.suspend),
            ] {
                match (x, y) {
                    (Deadline::On(dx), Deadline::On(dy)) => prop_assert!(dy >= dx),
                    (Deadline::Never, Deadline::Never) => {}
                    _ => prop_assert!(false, "enabledness must not depend on anchor"),
                }
            }
        }

        #[test]
        fn disabled_on_hold_never_reached(
            offset in 0u64..2000,
            probe in 0u64..4000,
        ) {
            let anchor = day(2020, 1, 1) + Days::new(offset);
            let today = day(2020, 1, 1) + Days::new(probe);
            let deadlines = evaluate(&config(14, 0, 90), anchor);
            prop_assert!(!deadlines.on_hold.reached(today));
            prop_assert!(!deadlines.on_hold_warning.reached(today));
        }
    }
}
