//! Booking commands.

use clap::Subcommand;

use flightbook_core::storage::BookingStore;
use flightbook_core::BookingLedger;

use super::common::{open_db, CliResult};

#[derive(Subcommand)]
pub enum BookingAction {
    /// Book a student's posted slot
    Create {
        /// Instructor making the booking
        #[arg(long)]
        instructor_id: i64,
        /// Student the booking is for
        #[arg(long)]
        student_id: i64,
        /// Course exercise the session covers
        #[arg(long)]
        exercise_id: i64,
        /// The posted slot to consume
        #[arg(long)]
        slot_id: i64,
    },
    /// Student confirmation of a proposed booking
    Confirm {
        /// Booking id
        id: i64,
    },
    /// Cancel a booking; --noshow retains it for the suspension counter
    Cancel {
        /// Booking id
        id: i64,
        /// The student failed to attend without cancelling
        #[arg(long)]
        noshow: bool,
    },
    /// Conclude a conducted session
    Conclude {
        /// Booking id
        id: i64,
    },
    /// Show one booking
    Show {
        /// Booking id
        id: i64,
    },
}

pub fn run(action: BookingAction) -> CliResult {
    let db = open_db()?;
    let ledger = BookingLedger::new(&db, &db, &db);

    match action {
        BookingAction::Create {
            instructor_id,
            student_id,
            exercise_id,
            slot_id,
        } => {
            let booking = ledger.book(instructor_id, student_id, exercise_id, slot_id)?;
            println!("Booking created: {}", booking.id);
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        BookingAction::Confirm { id } => {
            ledger.confirm(id)?;
            println!("Booking {id} confirmed");
        }
        BookingAction::Cancel { id, noshow } => {
            let booking = db
                .get_booking(id)?
                .ok_or(format!("booking {id} not found"))?;
            ledger.cancel(&booking, noshow)?;
            println!(
                "Booking {id} {}",
                if noshow { "recorded as no-show" } else { "cancelled" }
            );
        }
        BookingAction::Conclude { id } => {
            let booking = db
                .get_booking(id)?
                .ok_or(format!("booking {id} not found"))?;
            ledger.conclude(&booking)?;
            println!("Booking {id} concluded");
        }
        BookingAction::Show { id } => {
            let booking = db
                .get_booking(id)?
                .ok_or(format!("booking {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
    }

    Ok(())
}
