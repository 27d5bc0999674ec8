use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stormwatch::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "stormwatch",
    version,
    about = "Tracks active tropical cyclones from NHC feeds and posts advisory updates",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to STORMWATCH_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config value
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track cyclones and post advisories until interrupted
    Run,

    /// Scan the basin once and report what would be tracked
    Scan {
        /// Look up a single storm by name (strength filter does not apply)
        #[arg(short, long)]
        name: Option<String>,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Resolve an advisory clock time such as "1100 PM" "EDT"
    Resolve {
        /// 12-hour clock time, e.g. "1100 PM"
        time: String,

        /// NHC timezone abbreviation, e.g. EDT
        timezone: String,

        /// Reference instant (RFC 3339); defaults to now
        #[arg(short, long)]
        reference: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("stormwatch starting");

    match cli.command {
        Commands::Run => {
            tracing::info!(
                basin_url = %config.feed.basin_url,
                strengths = ?config.feed.strengths,
                "Starting run command"
            );
            commands::run(config).await?;
        }

        Commands::Scan { name, json } => {
            tracing::info!(name = ?name, json = %json, "Starting scan command");
            commands::scan(config, name, json).await?;
        }

        Commands::Resolve {
            time,
            timezone,
            reference,
        } => {
            commands::resolve(&config, &time, &timezone, reference)?;
        }
    }

    tracing::info!("stormwatch stopped");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("stormwatch=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("stormwatch={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
