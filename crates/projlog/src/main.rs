//! projlog - project close logger for CAD host sessions

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use projlog_core::config::{default_log_dir, default_settings_path};
use projlog_core::LoggerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "projlog",
    version,
    about = "Project close logger for CAD host sessions",
    long_about = "Inspect and control the project close logger.\n\
                  \n\
                  Every project closed in the host appends one row of document metrics\n\
                  to a monthly CSV file (logs_YYYYMM.csv) in the log directory.\n\
                  \n\
                  Examples:\n\
                    projlog status                     # Show export state and current log\n\
                    projlog toggle                     # Enable/disable logging\n\
                    projlog show --month 202603        # Print a monthly log\n\
                    projlog replay demos/day.json      # Feed scripted host events\n\
                  \n\
                  Environment Variables:\n\
                    PROJLOG_SETTINGS                   # Override settings file\n\
                    PROJLOG_LOG_DIR                    # Override log directory\n\
                    RUST_LOG                           # Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file holding the export toggle
    #[arg(long, global = true, env = "PROJLOG_SETTINGS")]
    settings: Option<PathBuf>,

    /// Directory receiving monthly CSV logs
    #[arg(long, global = true, env = "PROJLOG_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show export state and the current monthly log
    Status,
    /// Flip the export toggle
    Toggle,
    /// Replay a scripted sequence of host document events
    Replay {
        /// JSON replay script
        script: PathBuf,
    },
    /// Print a monthly log as a table
    Show {
        /// Month as YYYYMM (default: current month)
        #[arg(long, short = 'm')]
        month: Option<String>,
        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },
}

fn resolve_config(settings: Option<PathBuf>, log_dir: Option<PathBuf>) -> Result<LoggerConfig> {
    let settings_path = match settings {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    Ok(LoggerConfig::new(settings_path, log_dir))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.settings, cli.log_dir)?;

    match cli.command {
        Command::Status => cli::run_status(&config)?,
        Command::Toggle => cli::run_toggle(&config)?,
        Command::Replay { script } => cli::run_replay(config, &script)?,
        Command::Show { month, no_color } => {
            cli::run_show(&config.log_dir, month.as_deref(), no_color)?
        }
    }

    Ok(())
}
