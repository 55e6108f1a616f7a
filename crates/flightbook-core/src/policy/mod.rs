//! Restriction policy and the activity clock.
//!
//! This module provides:
//! - The wait anchor and recency computation for a student
//! - Pure deadline arithmetic from course restriction settings
//!
//! Everything here is side-effect free and reasons in course-local
//! calendar days, never instants, so a sweep running just before or
//! just after midnight computes the same deadlines.

mod clock;
mod restriction;

pub use clock::{recency_days, wait_anchor};
pub use restriction::{evaluate, Deadline, Deadlines, RestrictionConfig};
