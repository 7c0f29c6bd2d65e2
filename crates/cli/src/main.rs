//! Tally CLI - drives simulated workloads through the progress engine.

mod bar;

use anyhow::Result;
use bar::Bar;
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{Recorder, SharedSink};
use tally_progress::{Norm, Progress, ProgressConfig, Zip};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Hierarchical progress reporting demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write every reported value to this file as JSON
    #[arg(long, global = true)]
    record: Option<PathBuf>,

    /// Only redraw once per increment of this size
    #[arg(long, global = true)]
    increment: Option<f64>,

    /// Bar width in characters
    #[arg(long, global = true, default_value = "40")]
    width: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run nested sequential scopes
    Nested {
        /// Steps per scope
        #[arg(long, default_value = "4")]
        steps: u64,
        /// Nesting depth
        #[arg(long, default_value = "2")]
        depth: u32,
        /// Delay per leaf step in milliseconds
        #[arg(long, default_value = "50")]
        delay_ms: u64,
    },
    /// Run concurrent branches joined by a norm
    Race {
        /// Number of branches
        #[arg(long, default_value = "3")]
        branches: usize,
        /// Norm joining the branches (max or min)
        #[arg(long, default_value = "min")]
        norm: Norm,
        /// Steps per branch
        #[arg(long, default_value = "20")]
        steps: u64,
        /// Base delay per step in milliseconds
        #[arg(long, default_value = "10")]
        delay_ms: u64,
    },
    /// Run a scope driven by wall-clock time
    Timed {
        /// Expected duration in milliseconds
        #[arg(long, default_value = "1000")]
        millis: u64,
        /// Number of redraws
        #[arg(long, default_value = "20")]
        ticks: u32,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let recorder = Arc::new(Recorder::new());
    let bar: SharedSink = Arc::new(Bar::new("progress", cli.width));
    let recorded: SharedSink = recorder.clone();
    let observer: SharedSink = Arc::new(Zip::new(bar, recorded));

    let mut config = ProgressConfig::new();
    if let Some(increment) = cli.increment {
        config = config.with_increment(increment);
    }
    let progress = Progress::with_config(observer, config)?;

    match cli.command {
        Commands::Nested { steps, depth, delay_ms } => {
            info!(steps, depth, "running nested workload");
            run_nested(&progress, steps, depth.max(1), Duration::from_millis(delay_ms)).await?;
        }
        Commands::Race { branches, norm, steps, delay_ms } => {
            info!(branches, %norm, steps, "running concurrent workload");
            run_race(&progress, branches, norm, steps, Duration::from_millis(delay_ms)).await?;
        }
        Commands::Timed { millis, ticks } => {
            info!(millis, ticks, "running timed workload");
            run_timed(&progress, Duration::from_millis(millis), ticks.max(1)).await?;
        }
    }

    info!(reports = recorder.len(), "workload finished");

    if let Some(path) = cli.record {
        tokio::fs::write(&path, recorder.to_json()?).await?;
        info!("Recording written to {}", path.display());
    }

    Ok(())
}

fn run_nested<'a>(
    progress: &'a Progress,
    steps: u64,
    depth: u32,
    delay: Duration,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let scope = progress.schedule(steps)?;
        for _ in 0..steps {
            if depth > 1 {
                // closing the child counts as our step
                run_nested(progress, steps, depth - 1, delay).await?;
            } else {
                tokio::time::sleep(delay).await;
                scope.report();
            }
        }
        Ok(())
    })
}

async fn run_race(
    progress: &Progress,
    branches: usize,
    norm: Norm,
    steps: u64,
    delay: Duration,
) -> Result<()> {
    let scope = progress.schedule(1)?;

    let handles: Vec<_> = progress
        .concurrent_each(norm, 1..=branches as u32)
        .into_iter()
        .map(|(speed, branch)| {
            tokio::spawn(async move {
                let local = Progress::new(branch);
                let work = local.schedule(steps)?;
                for _ in 0..steps {
                    tokio::time::sleep(delay * speed).await;
                    work.report();
                }
                anyhow::Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.await??;
    }

    scope.complete();
    Ok(())
}

async fn run_timed(progress: &Progress, expected: Duration, ticks: u32) -> Result<()> {
    let scope = progress.time(expected)?;
    let tick = expected / ticks;
    for _ in 0..ticks {
        tokio::time::sleep(tick).await;
        scope.report();
    }
    Ok(())
}
