//! # Flightbook Core Library
//!
//! Core business logic for flight-training session booking: students
//! post availability slots, instructors book them, and a daily sweep
//! walks every student's training lifecycle (active -> on-hold ->
//! suspended -> graduated/reinstated) against computed deadlines.
//!
//! ## Architecture
//!
//! - **Availability**: week posting with replace-on-save semantics and
//!   lane packing for the overlapping-slot week view
//! - **Policy**: pure date arithmetic -- the wait anchor and the
//!   restriction deadlines derived from course settings
//! - **Lifecycle**: the per-student state machine and the cron sweep
//!   driving it, with idempotent one-shot notification gating
//! - **Booking**: the conflict-checked booking ledger
//! - **Storage**: SQLite-backed repository traits; entities are flat
//!   rows composed in memory by the caller
//!
//! ## Key Components
//!
//! - [`LanePacker`]: greedy lane assignment with same-student stacking
//! - [`LifecycleEngine`]: one participant's evaluation for one day
//! - [`Sweep`]: the scheduler-driven batch entry point
//! - [`BookingLedger`]: booking creation, confirmation, cancellation
//! - [`Database`]: the SQLite implementation of every store trait

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod participant;
pub mod policy;
pub mod slot;
pub mod storage;
pub mod subscriber;

pub use booking::{Booking, BookingLedger};
pub use error::{ConflictError, CoreError, DatabaseError, Result, ValidationError};
pub use lifecycle::sweep::{Sweep, SweepReport};
pub use lifecycle::{LifecycleEngine, TickOutcome};
pub use notify::{Notification, NotificationDispatcher, NotificationKind};
pub use participant::{Instructor, ProgressFlag, ProgressRecord, Student, StudentStanding, StudentStatus};
pub use policy::{Deadline, Deadlines, RestrictionConfig};
pub use slot::{Lane, LanePacker, Slot, TimeWindow, WeekLanes};
pub use storage::Database;
pub use subscriber::Subscriber;
