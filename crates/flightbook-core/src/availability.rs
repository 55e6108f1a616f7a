//! Week availability posting and the posting horizon.
//!
//! Posting is replace-on-save per week. A window may only be posted on
//! a day that is not in the past, not beyond the course lookahead, and
//! not before the student's next allowed session date (the posting-wait
//! restriction, waived by the posting waiver flag).

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::{Result, ValidationError};
use crate::participant::Student;
use crate::policy::{wait_anchor, RestrictionConfig};
use crate::slot::{LanePacker, TimeWindow, WeekLanes};
use crate::storage::{ProgressStore, SlotStore};
use crate::subscriber::Subscriber;

/// The first day the student may hold a session again.
///
/// Anchor + posting wait, clamped to `today` once passed; a result
/// landing on today bumps past a Sunday so the week view never opens on
/// a dead day. Waived students get `today` directly.
pub fn next_allowed_session_date(
    student: &Student,
    config: &RestrictionConfig,
    today: NaiveDate,
) -> NaiveDate {
    let mut next = today;

    if config.posting_wait_days > 0 && !student.progress.has_posting_waiver() {
        let candidate = wait_anchor(student) + Days::new(u64::from(config.posting_wait_days));
        if candidate > today {
            next = candidate;
        }
    }

    if next == today && today.weekday() == Weekday::Sun {
        next = next + Days::new(1);
    }

    next
}

/// Check one calendar day against the posting horizon.
pub fn check_posting_day(
    day: NaiveDate,
    today: NaiveDate,
    next_allowed: NaiveDate,
    lookahead_weeks: u32,
) -> Result<(), ValidationError> {
    if day < today {
        return Err(ValidationError::OutsidePostingHorizon {
            reason: format!("{day} is in the past"),
        });
    }
    if day < next_allowed {
        return Err(ValidationError::OutsidePostingHorizon {
            reason: format!("{day} is before the next allowed session date {next_allowed}"),
        });
    }
    // lookahead of 0 means unlimited
    if lookahead_weeks > 0 {
        let limit = today + Days::new(u64::from(lookahead_weeks) * 7);
        if day > limit {
            return Err(ValidationError::OutsidePostingHorizon {
                reason: format!("{day} is beyond the {lookahead_weeks}-week lookahead"),
            });
        }
    }
    Ok(())
}

/// Replace the student's availability for one week.
///
/// Validates every window against the posting horizon, swaps the week's
/// posted slots atomically, and accumulates the new slot ids on the
/// posting-digest flag for the instructor notification pass.
#[allow(clippy::too_many_arguments)]
pub fn post_week(
    slots: &dyn SlotStore,
    progress: &dyn ProgressStore,
    student: &mut Student,
    course: &Subscriber,
    lookahead_weeks: u32,
    today: NaiveDate,
    year: i32,
    week: u32,
    windows: &[TimeWindow],
) -> Result<Vec<i64>> {
    let next_allowed = next_allowed_session_date(student, &course.config, today);
    for window in windows {
        check_posting_day(
            window.start().date_naive(),
            today,
            next_allowed,
            lookahead_weeks,
        )?;
    }

    let ids = slots.replace_week(course.id, student.id, year, week, windows)?;

    student.progress.append_posted_slots(&ids);
    progress.save_progress(course.id, student.id, &student.progress)?;

    Ok(ids)
}

/// Delete the student's posted slots for one week and reset the digest
/// accumulator.
pub fn clear_week(
    slots: &dyn SlotStore,
    progress: &dyn ProgressStore,
    student: &mut Student,
    course_id: i64,
    year: i32,
    week: u32,
) -> Result<()> {
    slots.delete_posted_week(course_id, student.id, year, week)?;
    student.progress.clear_posted_slots();
    progress.save_progress(course_id, student.id, &student.progress)
}

/// Lane-packed week view across all students of a course.
pub fn week_lanes(
    slots: &dyn SlotStore,
    course_id: i64,
    year: i32,
    week: u32,
) -> Result<WeekLanes> {
    let week_slots = slots.course_week_slots(course_id, year, week)?;
    Ok(LanePacker::new().pack_week(&week_slots))
}
