//! Lane packing for the weekly availability grid.
//!
//! Slots posted by different students overlap freely in time; the week
//! view renders them in "lanes" so no two conflicting slots share a
//! column. Packing is a greedy interval assignment with one exception:
//! consecutive slots from the same student may stack in one lane even
//! when they overlap.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Slot;
use crate::config::{MAX_LANES, MIN_LANES};

/// One ordered column of non-conflicting slots for a single day.
pub type Lane = Vec<Slot>;

/// Greedy lane packer for a single day's slots.
///
/// Processing order is the caller's slice order (arrival/posting order),
/// which makes the output deterministic for a fixed input.
#[derive(Debug, Clone)]
pub struct LanePacker {
    max_lanes: usize,
}

impl LanePacker {
    pub fn new() -> Self {
        Self {
            max_lanes: MAX_LANES,
        }
    }

    /// Override the display cap on lanes.
    pub fn with_max_lanes(mut self, max_lanes: usize) -> Self {
        self.max_lanes = max_lanes;
        self
    }

    /// Assign each slot of one calendar day to a lane.
    ///
    /// A slot joins the first lane (in index order) where every placed
    /// slot either does not overlap it or belongs to the same student.
    /// Otherwise a new lane opens. Empty input produces zero lanes.
    pub fn pack(&self, day_slots: &[Slot]) -> Vec<Lane> {
        let mut lanes: Vec<Lane> = Vec::new();

        for slot in day_slots {
            match self.find_lane(&lanes, slot) {
                Some(idx) => lanes[idx].push(slot.clone()),
                None => lanes.push(vec![slot.clone()]),
            }
        }

        lanes
    }

    /// First lane that can take the slot without a visual conflict.
    fn find_lane(&self, lanes: &[Lane], slot: &Slot) -> Option<usize> {
        lanes.iter().position(|lane| {
            lane.iter().all(|placed| {
                !placed.window.overlaps(&slot.window) || placed.student_id == slot.student_id
            })
        })
    }

    /// Pack a whole week of slots, grouped by the day each slot starts
    /// on, tracking the running lane maximum across days.
    pub fn pack_week(&self, slots: &[Slot]) -> WeekLanes {
        let mut days: BTreeMap<NaiveDate, Vec<Slot>> = BTreeMap::new();
        for slot in slots {
            days.entry(slot.window.start().date_naive())
                .or_default()
                .push(slot.clone());
        }

        let mut packed = BTreeMap::new();
        let mut max_lanes = 0usize;
        for (day, day_slots) in days {
            let lanes = self.pack(&day_slots);
            max_lanes = max_lanes.max(lanes.len());
            packed.insert(day, lanes);
        }

        WeekLanes {
            days: packed,
            max_lanes,
            lane_cap: self.max_lanes,
        }
    }
}

impl Default for LanePacker {
    fn default() -> Self {
        Self::new()
    }
}

/// Lanes for every day of a week plus the raw lane maximum.
///
/// Lane indexes are stable only within the packing call that produced
/// them; they are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekLanes {
    days: BTreeMap<NaiveDate, Vec<Lane>>,
    max_lanes: usize,
    lane_cap: usize,
}

impl WeekLanes {
    /// Lanes for one day, capped for display. Overflow lanes are
    /// dropped from this view; [`WeekLanes::max_lanes`] keeps the raw
    /// count for UI hinting.
    pub fn day(&self, day: NaiveDate) -> &[Lane] {
        let lanes = self
            .days
            .get(&day)
            .map(|l| l.as_slice())
            .unwrap_or_default();
        &lanes[..lanes.len().min(self.lane_cap)]
    }

    /// Raw maximum lane count across the week, uncapped.
    pub fn max_lanes(&self) -> usize {
        self.max_lanes
    }

    /// Lane count to render for the grid: raw maximum clamped into
    /// `[MIN_LANES, cap]` for the all-students view, bare minimum 1 for
    /// a single student's own view.
    pub fn display_lanes(&self, group_view: bool) -> usize {
        let floor = if group_view { MIN_LANES } else { 1 };
        self.max_lanes.max(floor).min(self.lane_cap)
    }

    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<Lane>)> {
        self.days.iter()
    }
}
