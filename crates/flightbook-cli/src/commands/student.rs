//! Student inspection and override commands.

use clap::Subcommand;

use flightbook_core::config::KEEP_ACTIVE_GROUP;
use flightbook_core::policy;
use flightbook_core::storage::{CourseStore, GroupMembership, ProgressStore};
use flightbook_core::StudentStatus;

use super::common::{open_db, parse_day, CliResult};

#[derive(Subcommand)]
pub enum StudentAction {
    /// List students of a course
    List {
        #[arg(long)]
        course_id: i64,
        /// Filter: active, onhold, suspended, graduated
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a student's standing and computed deadlines
    Show {
        #[arg(long)]
        course_id: i64,
        /// Student id
        id: i64,
        /// Treat this day as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Toggle the keep-active override group
    KeepActive {
        #[arg(long)]
        course_id: i64,
        /// Student id
        id: i64,
        /// Remove instead of add
        #[arg(long)]
        remove: bool,
    },
    /// Toggle the posting-wait waiver flag
    Waiver {
        #[arg(long)]
        course_id: i64,
        /// Student id
        id: i64,
        /// Remove instead of grant
        #[arg(long)]
        remove: bool,
    },
}

pub fn run(action: StudentAction) -> CliResult {
    let db = open_db()?;

    match action {
        StudentAction::List { course_id, status } => {
            let status = status.as_deref().map(StudentStatus::parse);
            let students = db.students(course_id, status)?;
            for student in &students {
                println!(
                    "{:>6}  {:<10}  {}",
                    student.id,
                    student.status.as_str(),
                    student.name
                );
            }
            println!("{} student(s)", students.len());
        }
        StudentAction::Show {
            course_id,
            id,
            today,
        } => {
            let course = db
                .get_course(course_id)?
                .ok_or(format!("course {course_id} not found"))?;
            let student = db
                .get_student(course_id, id)?
                .ok_or(format!("student {id} not enrolled in course {course_id}"))?;
            let today = parse_day(today.as_deref())?;

            let anchor = policy::wait_anchor(&student);
            let deadlines = policy::evaluate(&course.config, anchor);

            println!("{} ({})", student.name, student.status.as_str());
            println!("  wait anchor:   {anchor}");
            println!("  recency days:  {}", policy::recency_days(&student, today));
            println!("  deadlines:     {}", serde_json::to_string(&deadlines)?);
            println!(
                "  kept active:   {}",
                db.is_member(course_id, KEEP_ACTIVE_GROUP, id)?
            );
            println!(
                "  post waiver:   {}",
                student.progress.has_posting_waiver()
            );
        }
        StudentAction::KeepActive {
            course_id,
            id,
            remove,
        } => {
            if remove {
                db.remove_member(course_id, KEEP_ACTIVE_GROUP, id)?;
                println!("Student {id} removed from keep-active");
            } else {
                db.add_member(course_id, KEEP_ACTIVE_GROUP, id)?;
                println!("Student {id} added to keep-active");
            }
        }
        StudentAction::Waiver {
            course_id,
            id,
            remove,
        } => {
            let mut student = db
                .get_student(course_id, id)?
                .ok_or(format!("student {id} not enrolled in course {course_id}"))?;
            student.progress.set_posting_waiver(!remove);
            db.save_progress(course_id, id, &student.progress)?;
            println!(
                "Posting waiver {} for student {id}",
                if remove { "removed" } else { "granted" }
            );
        }
    }

    Ok(())
}
