use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use ml_traffic::modes::{TrainConfig, TrainMode, TrainingReport, VisualizeMode};
use ml_traffic::rl::{TrainingBackend, default_device};

#[derive(Parser)]
#[command(name = "ml_traffic")]
#[command(version, about = "Adaptive traffic signal control with deep Q-learning")]
struct Cli {
    /// Run mode
    #[arg(long, default_value = "train")]
    mode: Mode,

    /// Number of training episodes [default: 500]
    #[arg(long)]
    episodes: Option<usize>,

    /// Master seed for a reproducible run (entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log a rolling summary every N episodes [default: 10]
    #[arg(long)]
    log_frequency: Option<usize>,

    /// JSON file with a full or partial training configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "ml_traffic=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Train without a display, logging progress
    Train,
    /// Train while drawing the intersection in the terminal
    Visualize,
}

impl Cli {
    /// Build the training configuration: file first, then flags on top
    fn train_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?,
            None => TrainConfig::default(),
        };

        if let Some(episodes) = self.episodes {
            config.num_episodes = episodes;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(log_frequency) = self.log_frequency {
            config.log_frequency = log_frequency;
        }

        Ok(config)
    }
}

fn init_logging(log_level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filters) = log_level {
        builder.parse_filters(filters);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = cli.train_config()?;
    let device = default_device();

    // Dispatch to appropriate mode
    let report = match cli.mode {
        Mode::Train => {
            let train_mode = TrainMode::<TrainingBackend>::new(config, device)?;
            run_headless(train_mode).await?
        }
        Mode::Visualize => {
            let mut visualize_mode = VisualizeMode::<TrainingBackend>::new(config, device)?;
            visualize_mode.run().await?
        }
    };

    log_report(&report);

    Ok(())
}

/// Run headless training on a worker thread while Ctrl+C is watched
///
/// The episode loop is synchronous, so it runs under `block_in_place`; the
/// signal task keeps running on the other runtime workers and stops training
/// between ticks.
async fn run_headless(mut train_mode: TrainMode<TrainingBackend>) -> Result<TrainingReport> {
    let stop = train_mode.stop_signal();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, finishing the current step");
            stop.request();
        }
    });

    let report = tokio::task::block_in_place(|| train_mode.run());
    watcher.abort();
    report
}

fn log_report(report: &TrainingReport) {
    if report.interrupted {
        info!(
            "Stopped after {} episodes ({} environment steps)",
            report.episodes_completed, report.total_steps
        );
    } else {
        info!(
            "Finished {} episodes ({} environment steps)",
            report.episodes_completed, report.total_steps
        );
    }
    info!(
        "Training steps: {} | Final epsilon: {:.2}",
        report.training_steps, report.final_epsilon
    );
    if let Some(best) = report
        .episodes
        .iter()
        .filter(|e| !e.interrupted)
        .map(|e| e.reward)
        .reduce(f32::max)
    {
        info!("Best episode reward: {:.2}", best);
    }
}
