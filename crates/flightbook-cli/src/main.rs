use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "flightbook-cli", version, about = "Flightbook CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Availability slot management
    Slot {
        #[command(subcommand)]
        action: commands::slot::SlotAction,
    },
    /// Booking management
    Booking {
        #[command(subcommand)]
        action: commands::booking::BookingAction,
    },
    /// Student inspection and overrides
    Student {
        #[command(subcommand)]
        action: commands::student::StudentAction,
    },
    /// Course subscription management
    Course {
        #[command(subcommand)]
        action: commands::course::CourseAction,
    },
    /// Lifecycle sweep and the notification queue
    Sweep {
        #[command(subcommand)]
        action: commands::sweep::SweepAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Slot { action } => commands::slot::run(action),
        Commands::Booking { action } => commands::booking::run(action),
        Commands::Student { action } => commands::student::run(action),
        Commands::Course { action } => commands::course::run(action),
        Commands::Sweep { action } => commands::sweep::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
