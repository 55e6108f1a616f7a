//! Availability slot commands.

use clap::Subcommand;

use flightbook_core::availability;
use flightbook_core::storage::{CourseStore, SlotStore};

use super::common::{iso_week_of, open_db, parse_day, parse_window, CliResult};

#[derive(Subcommand)]
pub enum SlotAction {
    /// Post a week of availability (replaces the week's posted slots)
    Post {
        /// Course id
        #[arg(long)]
        course_id: i64,
        /// Student id
        #[arg(long)]
        student_id: i64,
        /// Window(s) as <start>/<end> in RFC 3339, repeatable
        #[arg(long = "window", required = true)]
        windows: Vec<String>,
        /// Weeks-lookahead override (0 = unlimited)
        #[arg(long, default_value = "5")]
        lookahead: u32,
        /// Treat this day as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// List a student's slots for a week
    List {
        #[arg(long)]
        course_id: i64,
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u32,
    },
    /// Show the lane-packed week grid across all students
    Lanes {
        #[arg(long)]
        course_id: i64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u32,
    },
    /// Delete a student's posted slots for a week
    Clear {
        #[arg(long)]
        course_id: i64,
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u32,
    },
}

pub fn run(action: SlotAction) -> CliResult {
    let db = open_db()?;

    match action {
        SlotAction::Post {
            course_id,
            student_id,
            windows,
            lookahead,
            today,
        } => {
            let course = db
                .get_course(course_id)?
                .ok_or(format!("course {course_id} not found"))?;
            let mut student = db
                .get_student(course_id, student_id)?
                .ok_or(format!("student {student_id} not enrolled in course {course_id}"))?;

            let windows = windows
                .iter()
                .map(|raw| parse_window(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let (year, week) = iso_week_of(windows.first().ok_or("no windows given")?);
            let today = parse_day(today.as_deref())?;

            let ids = availability::post_week(
                &db, &db, &mut student, &course, lookahead, today, year, week, &windows,
            )?;
            println!("Posted {} slot(s) for week {week}/{year}: {ids:?}", ids.len());
        }
        SlotAction::List {
            course_id,
            student_id,
            year,
            week,
        } => {
            let slots = db.student_week_slots(course_id, student_id, year, week)?;
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        SlotAction::Lanes {
            course_id,
            year,
            week,
        } => {
            let lanes = availability::week_lanes(&db, course_id, year, week)?;
            println!("max lanes: {}", lanes.max_lanes());
            for (day, day_lanes) in lanes.days() {
                println!("{day}:");
                for (idx, lane) in day_lanes.iter().enumerate() {
                    let windows: Vec<String> = lane
                        .iter()
                        .map(|s| {
                            format!(
                                "{}-{} (student {})",
                                s.window.start().format("%H:%M"),
                                s.window.end().format("%H:%M"),
                                s.student_id
                            )
                        })
                        .collect();
                    println!("  lane {idx}: {}", windows.join(", "));
                }
            }
        }
        SlotAction::Clear {
            course_id,
            student_id,
            year,
            week,
        } => {
            let mut student = db
                .get_student(course_id, student_id)?
                .ok_or(format!("student {student_id} not enrolled in course {course_id}"))?;
            availability::clear_week(&db, &db, &mut student, course_id, year, week)?;
            println!("Cleared posted slots for week {week}/{year}");
        }
    }

    Ok(())
}
