//! Cadence CLI Application
//!
//! Command-line interface for the cadence plan composition and
//! adaptation engine.

mod args;
mod cli;
mod renderer;

use anyhow::{Context, Result};
use args::{Args, Commands};
use cadence_core::EngineBuilder;
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        catalog_file,
        no_color,
        command,
    } = Args::parse();

    let engine = EngineBuilder::new()
        .with_database_path(database_file)
        .with_catalog_path(catalog_file)
        .build()
        .await
        .context("Failed to initialize engine")?;

    let renderer = TerminalRenderer::new(!no_color);
    let cli = Cli::new(engine, renderer);

    info!("Cadence started");

    match command {
        Commands::User { command } => cli.handle_user_command(command).await,
        Commands::Draft { command } => cli.handle_draft_command(command).await,
        Commands::Plan { command } => cli.handle_plan_command(command).await,
        Commands::Step { command } => cli.handle_step_command(command).await,
    }
}
