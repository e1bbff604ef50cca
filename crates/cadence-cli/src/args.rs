use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{DraftCommands, PlanCommands, StepCommands, UserCommands};

/// Main command-line interface for the Cadence plan engine
///
/// Cadence composes deterministic multi-day wellbeing plans from three
/// parameters (duration, focus, load) and adapts running plans — load,
/// difficulty, duration, focus, pause/resume — with full audit history.
#[derive(Parser)]
#[command(version, about, name = "cadence")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/cadence/cadence.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Path to a content library JSON file. Defaults to the embedded
    /// library
    #[arg(long, global = true)]
    pub catalog_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the Cadence CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Manage users (timezone, slot times, session state)
    #[command(alias = "u")]
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Compose and inspect plan drafts
    #[command(alias = "d")]
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Activate, inspect, and adapt live plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Complete or skip individual steps
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
}
