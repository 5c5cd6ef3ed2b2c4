use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use taxitrip_core::DatabaseSettings;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::db::{handle_stats_command, handle_trips_command, StatsCommands, TripsCommands};
use commands::explore::ExploreArgs;
use commands::process::{EnrichArgs, LoadArgs, ProcessArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "NYC taxi trip validation and feature pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and enrich trip files, writing one output table
    Process(ProcessArgs),
    /// Validate and enrich trip files, then store them in Postgres
    Load(LoadArgs),
    /// Run a single trip given as a JSON object through the strict checks
    Enrich(EnrichArgs),
    /// Profile a raw trip file
    Explore(ExploreArgs),
    /// Print the active validation rules
    Rules {
        /// TOML file overriding the default thresholds
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
    /// Run database migrations
    Migrate,
    /// Query stored trip statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Look up stored trips
    Trips {
        #[command(subcommand)]
        command: TripsCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process(args) => commands::process::handle_process(args),
        Command::Load(args) => commands::process::handle_load(args).await,
        Command::Enrich(args) => commands::process::handle_enrich(args),
        Command::Explore(args) => commands::explore::handle_explore(args),
        Command::Rules { config } => commands::process::handle_rules(config.as_deref()),
        Command::Migrate => {
            let pool = taxitrip_core::db::connect(&DatabaseSettings::from_env()?).await?;
            taxitrip_core::db::run_migrations(&pool).await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Stats { command } => handle_stats_command(command).await,
        Command::Trips { command } => handle_trips_command(command).await,
    }
}
