//! Command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use containerburn_core::{OrchestratorBuilder, RunSummary, StatusEvent};
use containerburn_runtime::DockerRuntime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{load_config, Commands, OutputFormat, RunArgs};

/// Run the selected command; no subcommand means `run` with defaults
pub async fn dispatch(command: Option<Commands>) -> Result<()> {
    match command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(args).await,
        Commands::Validate { config } => validate(&config),
        Commands::Prune { config } => prune(config.as_deref()).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.apply(load_config(args.config.as_deref())?);
    config.validate().context("invalid configuration")?;

    let runtime = DockerRuntime::connect(&config).await?;
    let (mut orchestrator, status_rx) = OrchestratorBuilder::new()
        .config(config)
        .runtime(Arc::new(runtime))
        .build()?;

    let printer = tokio::spawn(print_status(status_rx, args.format));

    let result = orchestrator
        .run_with_signal_handling(
            CancellationToken::new(),
            args.run_for.map(Duration::from_secs),
        )
        .await;

    // The status channel closes once every worker is gone.
    let printed = printer.await;
    let summary = result?;
    printed.context("status printer failed")?;

    print_summary(&summary, args.format);
    Ok(())
}

fn validate(path: &std::path::Path) -> Result<()> {
    let config = load_config(Some(path))?;
    config
        .validate()
        .with_context(|| format!("{} is not a valid configuration", path.display()))?;

    println!("{} is valid", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("workers: {}", config.pool_size());
    Ok(())
}

async fn prune(path: Option<&std::path::Path>) -> Result<()> {
    let config = load_config(path)?;
    let runtime = DockerRuntime::connect(&config).await?;
    let (orchestrator, _status_rx) = OrchestratorBuilder::new()
        .config(config)
        .runtime(Arc::new(runtime))
        .build()?;

    let removed = orchestrator.prune_networks().await?;
    println!("removed {removed} networks");
    Ok(())
}

async fn print_status(mut rx: mpsc::Receiver<StatusEvent>, format: OutputFormat) {
    while let Some(event) = rx.recv().await {
        match format {
            OutputFormat::Text => println!("{event}"),
            OutputFormat::Json => println!("{}", event.to_json_line()),
        }
    }
}

fn print_summary(summary: &RunSummary, format: OutputFormat) {
    let agg = &summary.aggregate;
    match format {
        OutputFormat::Text => {
            println!(
                "dispatched={} completed={} failed_exits={} wait_errors={} abandoned={} rate={:.2}/s",
                summary.dispatched,
                agg.total_completed,
                agg.total_failed_exits,
                agg.total_wait_errors,
                agg.total_abandoned,
                agg.workloads_per_second,
            );
        }
        OutputFormat::Json => {
            let line = serde_json::json!({
                "event": "summary",
                "dispatched": summary.dispatched,
                "workers": agg.total_workers,
                "completed": agg.total_completed,
                "failed_exits": agg.total_failed_exits,
                "wait_errors": agg.total_wait_errors,
                "abandoned": agg.total_abandoned,
                "duration_secs": agg.total_duration.as_secs_f64(),
                "workloads_per_second": agg.workloads_per_second,
            });
            println!("{line}");
        }
    }
}
