//! Course subscription commands.

use chrono::Utc;
use clap::Subcommand;

use flightbook_core::storage::CourseStore;
use flightbook_core::{
    Instructor, ProgressRecord, RestrictionConfig, Student, StudentStatus, Subscriber,
};

use super::common::{open_db, CliResult};

#[derive(Subcommand)]
pub enum CourseAction {
    /// Subscribe a course (or update its restriction settings)
    Add {
        /// Course id
        id: i64,
        /// Short course name
        shortname: String,
        /// Posting wait period in days (0 disables)
        #[arg(long, default_value = "0")]
        posting_wait: u32,
        /// On-hold period in days (0 disables)
        #[arg(long, default_value = "0")]
        on_hold: u32,
        /// Suspension period in days (0 disables)
        #[arg(long, default_value = "0")]
        suspension: u32,
        /// Instructor overdue cadence in days (0 disables)
        #[arg(long, default_value = "0")]
        overdue: u32,
    },
    /// List subscribed courses
    List,
    /// Enrol a student
    Enrol {
        #[arg(long)]
        course_id: i64,
        /// Student id
        id: i64,
        /// Student name
        name: String,
    },
    /// Attach an instructor
    AddInstructor {
        #[arg(long)]
        course_id: i64,
        /// Instructor id
        id: i64,
        /// Instructor name
        name: String,
        /// Senior instructors receive lifecycle carbon copies
        #[arg(long)]
        senior: bool,
    },
}

pub fn run(action: CourseAction) -> CliResult {
    let db = open_db()?;

    match action {
        CourseAction::Add {
            id,
            shortname,
            posting_wait,
            on_hold,
            suspension,
            overdue,
        } => {
            let course = Subscriber::new(
                id,
                shortname,
                RestrictionConfig {
                    posting_wait_days: posting_wait,
                    on_hold_period_days: on_hold,
                    suspension_period_days: suspension,
                    overdue_period_days: overdue,
                },
            );
            db.upsert_course(&course)?;
            println!("Course {} subscribed", course.shortname);
        }
        CourseAction::List => {
            for course in db.subscribed_courses()? {
                println!(
                    "{:>4}  {:<12}  wait={} onhold={} suspend={} overdue={}",
                    course.id,
                    course.shortname,
                    course.config.posting_wait_days,
                    course.config.on_hold_period_days,
                    course.config.suspension_period_days,
                    course.config.overdue_period_days,
                );
            }
        }
        CourseAction::Enrol {
            course_id,
            id,
            name,
        } => {
            db.upsert_student(&Student {
                id,
                course_id,
                name: name.clone(),
                status: StudentStatus::Active,
                last_session_date: None,
                last_graded_date: None,
                enrol_date: Utc::now(),
                progress: ProgressRecord::default(),
            })?;
            println!("Enrolled {name} in course {course_id}");
        }
        CourseAction::AddInstructor {
            course_id,
            id,
            name,
            senior,
        } => {
            db.upsert_instructor(&Instructor {
                id,
                course_id,
                name: name.clone(),
                last_booked_date: None,
                senior,
            })?;
            println!("Added instructor {name} to course {course_id}");
        }
    }

    Ok(())
}
