//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;

use anyhow::Result;
use clap::Subcommand;
use pipeline::PipelineCommands;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline definitions and lifecycle
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
    }
}
