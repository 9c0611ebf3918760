//! # Pulse CLI Module
//!
//! This module implements the CLI interface for Pulse.
//!
//! ## Available Commands
//!
//! - `compute` - Compute a project pulse and write a snapshot
//! - `directive` - Print only the extraction directive prompt
//! - `velocity` - Report signal velocity from event timestamps
//! - `config` - Print or validate the effective configuration

mod commands;

use clap::{Parser, Subcommand};
use pulse_core::{DEFAULT_WINDOW_DAYS, PulseError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Pulse - deterministic project health
///
/// Scores extracted entities against stage targets, classifies the project
/// stage and tells the extraction pipeline what to look for next.
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML or JSON config file (built-in defaults otherwise)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a project pulse
    Compute {
        /// Path to the project input (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to signal event timestamps (JSON array)
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Trailing velocity window in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS, value_parser = clap::value_parser!(u32).range(1..=365))]
        window_days: u32,

        /// Directory to write the pulse snapshot into
        #[arg(short, long)]
        snapshot_dir: Option<PathBuf>,

        /// What caused this computation (recorded in the snapshot key)
        #[arg(short, long, default_value = "manual")]
        trigger: String,

        /// Project id, overriding the one in the input
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Print the extraction directive prompt
    Directive {
        /// Path to the project input (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to signal event timestamps (JSON array)
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Trailing velocity window in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS, value_parser = clap::value_parser!(u32).range(1..=365))]
        window_days: u32,
    },

    /// Report signal velocity
    Velocity {
        /// Path to signal event timestamps (JSON array)
        #[arg(short, long)]
        events: PathBuf,

        /// Trailing velocity window in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS, value_parser = clap::value_parser!(u32).range(1..=365))]
        window_days: u32,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Only validate the config file and report the result
        #[arg(long)]
        check: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), PulseError> {
    let json_mode = cli.json_mode;
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Compute {
            input,
            events,
            window_days,
            snapshot_dir,
            trigger,
            project,
        }) => {
            cmd_compute(
                config,
                json_mode,
                cli.verbose,
                &input,
                events,
                window_days,
                snapshot_dir,
                &trigger,
                project,
            )
            .await
        }
        Some(Commands::Directive {
            input,
            events,
            window_days,
        }) => cmd_directive(config, json_mode, &input, events, window_days).await,
        Some(Commands::Velocity {
            events,
            window_days,
        }) => cmd_velocity(json_mode, &events, window_days).await,
        Some(Commands::Config { check }) => cmd_config(config, json_mode, check).await,
        None => {
            // No subcommand - validate the effective config by default
            cmd_config(config, json_mode, true).await
        }
    }
}
