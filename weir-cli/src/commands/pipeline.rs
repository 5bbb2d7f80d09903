//! Pipeline command handlers
//!
//! Submitting definitions, starting and stopping pipelines, migrating
//! running elements and inspecting what is deployed.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use weir_client::OrchestratorClient;
use weir_core::domain::pipeline::Pipeline;
use weir_core::domain::status::{OperationWarning, PipelineOperationStatus};
use weir_core::dto::pipeline::{ExecutionOptions, MigrateElement, PipelineSummary};

use crate::config::Config;
use crate::id_resolver::resolve_pipeline_id;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create or replace a pipeline from a JSON definition
    Submit {
        /// Path to the pipeline JSON file
        #[arg(short, long)]
        file: String,
    },
    /// List all pipelines
    List,
    /// Get pipeline details
    Get {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Deploy a pipeline on its nodes
    Start {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Do not register a monitoring observer
        #[arg(long)]
        no_monitor: bool,

        /// Do not persist the running flag
        #[arg(long)]
        no_store_status: bool,
    },
    /// Detach everything deployed for a pipeline
    Stop {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Keep visualization state
        #[arg(long)]
        keep_visualization: bool,

        /// Do not persist the running flag
        #[arg(long)]
        no_store_status: bool,
    },
    /// Replace a running element with one of an edited definition
    Migrate {
        /// Path to the edited pipeline JSON file
        #[arg(short, long)]
        file: String,

        /// DOM id of the replacement element in the edited definition
        #[arg(long)]
        target: String,

        /// DOM id of the running element; defaults to the target
        #[arg(long)]
        origin: Option<String>,
    },
    /// Show lifecycle messages of a pipeline
    Status {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Show what is deployed for a running pipeline
    Running {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
}

/// Handle pipeline commands
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        PipelineCommands::Submit { file } => submit_pipeline(&client, &file).await,
        PipelineCommands::List => list_pipelines(&client).await,
        PipelineCommands::Get { id } => get_pipeline(&client, &id).await,
        PipelineCommands::Start {
            id,
            no_monitor,
            no_store_status,
        } => {
            let options = ExecutionOptions {
                monitor: !no_monitor,
                store_status: !no_store_status,
                ..ExecutionOptions::default()
            };
            start_pipeline(&client, &id, options).await
        }
        PipelineCommands::Stop {
            id,
            keep_visualization,
            no_store_status,
        } => {
            let options = ExecutionOptions {
                visualize: !keep_visualization,
                store_status: !no_store_status,
                ..ExecutionOptions::default()
            };
            stop_pipeline(&client, &id, options).await
        }
        PipelineCommands::Migrate {
            file,
            target,
            origin,
        } => migrate_element(&client, &file, target, origin).await,
        PipelineCommands::Status { id } => status_history(&client, &id).await,
        PipelineCommands::Running { id } => running_graph(&client, &id).await,
    }
}

fn read_pipeline(path: &str) -> Result<Pipeline> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline definition: {}", path))
}

/// Create or replace a pipeline definition
async fn submit_pipeline(client: &OrchestratorClient, path: &str) -> Result<()> {
    let pipeline = read_pipeline(path)?;
    let pipeline = client.save_pipeline(&pipeline).await?;

    println!("{}", "✓ Pipeline saved successfully!".green().bold());
    println!("  ID:       {}", pipeline.id.to_string().cyan());
    println!("  Name:     {}", pipeline.name.bold());
    println!("  Revision: {}", pipeline.revision.to_string().dimmed());
    println!(
        "  Elements: {}",
        (pipeline.processors.len() + pipeline.sinks.len())
            .to_string()
            .dimmed()
    );

    Ok(())
}

/// List all pipelines
async fn list_pipelines(client: &OrchestratorClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

/// Get and display a single pipeline
async fn get_pipeline(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let pipeline = client.get_pipeline(uuid).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

async fn start_pipeline(client: &OrchestratorClient, id: &str, options: ExecutionOptions) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let status = client.start_pipeline(uuid, options).await?;
    print_operation_status("Start", &status);
    Ok(())
}

async fn stop_pipeline(client: &OrchestratorClient, id: &str, options: ExecutionOptions) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let status = client.stop_pipeline(uuid, options).await?;
    print_operation_status("Stop", &status);
    Ok(())
}

async fn migrate_element(
    client: &OrchestratorClient,
    path: &str,
    target: String,
    origin: Option<String>,
) -> Result<()> {
    let pipeline = read_pipeline(path)?;
    let req = MigrateElement {
        pipeline,
        origin_dom_id: origin.unwrap_or_else(|| target.clone()),
        target_dom_id: target,
    };

    let status = client.migrate_element(&req).await?;
    print_operation_status("Migration", &status);
    Ok(())
}

async fn status_history(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let messages = client.pipeline_status_history(uuid).await?;

    if messages.is_empty() {
        println!("{}", "No status messages recorded.".yellow());
        return Ok(());
    }

    for message in messages {
        println!(
            "  {} {} {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            message.message_type.title().bold(),
            message.message_type.description().dimmed()
        );
    }

    Ok(())
}

async fn running_graph(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, id).await?;
    let summary = match client.running_graph(uuid).await {
        Ok(summary) => summary,
        Err(err) if err.is_not_found() => {
            println!("{}", format!("Pipeline {} is not running.", uuid).yellow());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", "Running Graph:".bold());
    println!("  Pipeline: {}", summary.pipeline_id.to_string().cyan());
    println!(
        "  Deployed: {}",
        summary.deployed_at.format("%Y-%m-%d %H:%M:%S")
    );
    for element in &summary.elements {
        println!(
            "  {} {} on {}",
            "▸".cyan(),
            element.name.bold(),
            element.deployment_target.node_id.dimmed()
        );
    }
    for dataset in &summary.datasets {
        println!(
            "  {} {} (dataset) on {}",
            "▸".cyan(),
            dataset.name.bold(),
            dataset.deployment_target.node_id.dimmed()
        );
    }

    Ok(())
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &PipelineSummary) {
    let state = if pipeline.running {
        "running".green()
    } else {
        "stopped".dimmed()
    };
    println!("  {} {} [{}]", "▸".cyan(), pipeline.name.bold(), state);
    println!("    ID:       {}", pipeline.id.to_string().dimmed());
    println!("    Owner:    {}", pipeline.created_by_user.dimmed());
    println!(
        "    Elements: {}",
        pipeline.element_count.to_string().dimmed()
    );
    if let Some(started_at) = pipeline.started_at {
        println!(
            "    Started:  {}",
            started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(pipeline: &Pipeline) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:       {}", pipeline.id.to_string().cyan());
    println!("  Name:     {}", pipeline.name.bold());
    println!("  Owner:    {}", pipeline.created_by_user);
    println!("  Running:  {}", pipeline.running);
    println!("  Revision: {}", pipeline.revision);
    println!("  Relays:   {:?}", pipeline.relay_strategy);

    println!("\n{}", "Streams:".bold());
    for stream in &pipeline.streams {
        println!(
            "  {} {} ({}) on {}",
            "▸".cyan(),
            stream.name,
            stream.dom_id.dimmed(),
            stream.deployment_target.node_id
        );
    }

    println!("\n{}", "Elements:".bold());
    for element in pipeline.invocables() {
        println!(
            "  {} {} ({}) on {} <- {}",
            "▸".cyan(),
            element.name,
            element.dom_id.dimmed(),
            element.deployment_target.node_id,
            element.connected_to.join(", ").dimmed()
        );
    }
}

fn print_operation_status(operation: &str, status: &PipelineOperationStatus) {
    if status.success {
        println!(
            "{}",
            format!("✓ {} of {} succeeded", operation, status.pipeline_name)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "✗ {} of {} failed ({} call(s) failed)",
                operation,
                status.pipeline_name,
                status.failed_count()
            )
            .red()
            .bold()
        );
    }

    for element in &status.element_status {
        let mark = if element.success { "✓".green() } else { "✗".red() };
        println!(
            "  {} {} {}",
            mark,
            element.element_name,
            element.message.dimmed()
        );
    }

    for warning in &status.warnings {
        let text = match warning {
            OperationWarning::SecretLeftEncrypted {
                element_id,
                property,
                reason,
            } => format!("secret {} of {} left encrypted: {}", property, element_id, reason),
            OperationWarning::PersistenceFailed { message } => {
                format!("pipeline state not stored: {}", message)
            }
            OperationWarning::UnmatchedPredecessor { dom_id } => {
                format!("predecessor {} is not running", dom_id)
            }
        };
        println!("  {} {}", "!".yellow(), text.yellow());
    }
}
