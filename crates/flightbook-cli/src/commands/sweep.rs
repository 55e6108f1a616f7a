//! The sweep entry point and the notification queue.

use clap::Subcommand;

use flightbook_core::Sweep;

use super::common::{open_db, CliResult};

#[derive(Subcommand)]
pub enum SweepAction {
    /// Run the daily lifecycle sweep across all subscribed courses.
    ///
    /// Invoke from the external scheduler; overlapping runs against the
    /// same course must be excluded there.
    Run {
        /// Treat this day as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// List queued notifications
    Notifications,
}

pub fn run(action: SweepAction) -> CliResult {
    let db = open_db()?;

    match action {
        SweepAction::Run { today } => {
            let report = match today {
                Some(raw) => Sweep::at(&db, raw.parse()?).execute()?,
                None => Sweep::new(&db).execute()?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SweepAction::Notifications => {
            let pending = db.pending_notifications()?;
            for notification in &pending {
                println!(
                    "{}  {:<22}  to={} cc={:?}  {}",
                    notification.created_at.format("%Y-%m-%d %H:%M"),
                    format!("{:?}", notification.kind),
                    notification.recipient_id,
                    notification.cc_ids,
                    notification.payload,
                );
            }
            println!("{} notification(s) queued", pending.len());
        }
    }

    Ok(())
}
