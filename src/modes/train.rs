//! Training mode for the DQN signal controller
//!
//! Runs the episode loop: reset the intersection, then repeat
//! act → step → remember → train until the episode ends. Progress is logged
//! through the `log` facade and summarized every `log_frequency` episodes.
//!
//! The loop is also exposed one tick at a time so the visualizer can drive
//! the same training process at its own pace.
//!
//! # Example
//!
//! ```rust,no_run
//! use ml_traffic::modes::{TrainConfig, TrainMode};
//! use ml_traffic::rl::{TrainingBackend, default_device};
//!
//! let config = TrainConfig {
//!     num_episodes: 50,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
//! let report = train_mode.run()?;
//! println!("final epsilon: {:.2}", report.final_epsilon);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use burn::tensor::backend::AutodiffBackend;
use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::intersection::{IntersectionConfig, IntersectionState};
use crate::metrics::TrainingStats;
use crate::rl::{DqnAgent, DqnConfig, Observation, TrafficEnvironment};

/// Configuration for a training run
///
/// Every field has a default, so a JSON file only needs to name what it
/// overrides:
///
/// ```rust
/// use ml_traffic::modes::TrainConfig;
///
/// let config: TrainConfig = serde_json::from_str(r#"{ "num_episodes": 20, "dqn": { "gamma": 0.9 } }"#)?;
/// assert_eq!(config.num_episodes, 20);
/// assert_eq!(config.dqn.gamma, 0.9);
/// assert_eq!(config.dqn.batch_size, 32);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of episodes to train
    pub num_episodes: usize,

    /// Log a rolling summary every N episodes
    pub log_frequency: usize,

    /// Episodes kept for rolling averages
    pub stats_window: usize,

    /// Master seed; `None` seeds from entropy
    pub seed: Option<u64>,

    pub intersection: IntersectionConfig,

    pub dqn: DqnConfig,
}

impl TrainConfig {
    /// Create a training configuration with defaults
    pub fn new(num_episodes: usize) -> Self {
        Self {
            num_episodes,
            ..Default::default()
        }
    }

    /// Load a full or partial configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        Ok(config)
    }

    /// Validate this configuration and the nested ones
    pub fn validate(&self) -> Result<(), String> {
        if self.log_frequency == 0 {
            return Err("log_frequency must be at least 1".to_string());
        }

        if self.stats_window == 0 {
            return Err("stats_window must be at least 1".to_string());
        }

        self.intersection.validate()?;
        self.dqn.validate()
    }

    /// Seeds for the environment and the agent, or `None` for an unseeded run
    ///
    /// Both are drawn from one generator seeded with the master seed, so a
    /// seeded run is reproducible end to end.
    fn derive_seeds(&self) -> Option<(u64, u64)> {
        let mut seeder = StdRng::seed_from_u64(self.seed?);
        Some((seeder.r#gen(), seeder.r#gen()))
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_episodes: 500,
            log_frequency: 10,
            stats_window: 100,
            seed: None,
            intersection: IntersectionConfig::default(),
            dqn: DqnConfig::default(),
        }
    }
}

/// Cooperative stop request shared between the training loop and whoever
/// wants to end it (Ctrl+C handler, visualizer quit key)
///
/// Only checked between ticks, so a tick is never cut in half.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Zero-based episode index
    pub episode: usize,
    pub reward: f32,
    pub steps: usize,
    /// Vehicles present when the episode ended
    pub final_queue: usize,
    /// Mean TD loss over the episode's training steps, if any ran
    pub mean_loss: Option<f32>,
    pub epsilon: f64,
    /// The episode was cut short by a stop request
    pub interrupted: bool,
}

impl EpisodeSummary {
    /// Per-episode progress line; episodes are numbered from 1
    pub fn log_line(&self) -> String {
        format!(
            "Episode {}: Total Reward = {:.2}, Epsilon = {:.2}",
            self.episode + 1,
            self.reward,
            self.epsilon
        )
    }
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub episodes: Vec<EpisodeSummary>,
    pub episodes_completed: usize,
    pub total_steps: usize,
    pub training_steps: usize,
    pub final_epsilon: f64,
    pub interrupted: bool,
}

/// What happened on a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub action: usize,
    pub reward: f32,
    pub done: bool,
    /// Loss of the training step, when one ran
    pub loss: Option<f32>,
}

/// Bookkeeping for the episode in progress
#[derive(Debug, Clone)]
struct EpisodeProgress {
    observation: Observation,
    reward: f32,
    steps: usize,
    loss_sum: f32,
    loss_count: usize,
}

impl EpisodeProgress {
    fn new(observation: Observation) -> Self {
        Self {
            observation,
            reward: 0.0,
            steps: 0,
            loss_sum: 0.0,
            loss_count: 0,
        }
    }

    fn mean_loss(&self) -> Option<f32> {
        (self.loss_count > 0).then(|| self.loss_sum / self.loss_count as f32)
    }
}

/// Training mode for the DQN agent
pub struct TrainMode<B: AutodiffBackend> {
    agent: DqnAgent<B>,

    env: TrafficEnvironment,

    stats: TrainingStats,

    config: TrainConfig,

    stop: StopSignal,

    /// Episodes completed so far
    episode: usize,

    total_steps: usize,

    progress: Option<EpisodeProgress>,
}

impl<B: AutodiffBackend> TrainMode<B> {
    /// Create a new training mode
    ///
    /// Fails if any part of the configuration is invalid.
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        if let Err(reason) = config.validate() {
            bail!("Invalid training configuration: {}", reason);
        }

        let intersection = config.intersection.clone();
        let dqn = config.dqn.clone();
        let (env, agent) = match config.derive_seeds() {
            Some((env_seed, agent_seed)) => (
                TrafficEnvironment::seeded(intersection, env_seed),
                DqnAgent::seeded(dqn, device, agent_seed),
            ),
            None => (
                TrafficEnvironment::from_entropy(intersection),
                DqnAgent::from_entropy(dqn, device),
            ),
        };
        let env = env.context("Failed to create environment")?;
        let agent = agent.context("Failed to create agent")?;
        let stats = TrainingStats::new(config.stats_window);

        Ok(Self {
            agent,
            env,
            stats,
            config,
            stop: StopSignal::new(),
            episode: 0,
            total_steps: 0,
            progress: None,
        })
    }

    /// Handle for requesting a stop from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the training loop
    ///
    /// Trains for `num_episodes` episodes or until a stop is requested.
    pub fn run(&mut self) -> Result<TrainingReport> {
        self.log_header();

        let mut episodes = Vec::with_capacity(self.config.num_episodes);
        let mut interrupted = false;

        while !self.is_finished() {
            let summary = self.run_episode()?;
            interrupted = summary.interrupted;
            episodes.push(summary);

            if interrupted {
                info!("Stop requested, ending training early");
                break;
            }
        }

        let report = TrainingReport {
            episodes_completed: self.episode,
            total_steps: self.total_steps,
            training_steps: self.agent.steps(),
            final_epsilon: self.agent.epsilon(),
            episodes,
            interrupted: interrupted || self.stop.is_requested(),
        };

        info!("Training complete: {}", self.stats.format_summary());

        Ok(report)
    }

    /// Run one episode from reset until it ends or a stop is requested
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        self.start_episode();

        loop {
            if self.stop.is_requested() {
                return Ok(self.finish_episode(true));
            }

            let (_, summary) = self.tick()?;
            if let Some(summary) = summary {
                return Ok(summary);
            }
        }
    }

    /// Advance training by one environment step
    ///
    /// Starts a new episode when none is in progress. Returns the finished
    /// episode's summary alongside the tick when that step ended it.
    pub fn tick(&mut self) -> Result<(TickOutcome, Option<EpisodeSummary>)> {
        if self.progress.is_none() {
            self.start_episode();
        }
        let observation = match &self.progress {
            Some(progress) => progress.observation,
            None => bail!("No episode in progress"),
        };

        let action = self.agent.act(&observation);
        let (next_observation, reward, done) = self
            .env
            .step(action)
            .context("Agent produced an invalid action")?;
        self.agent
            .remember(observation, action, reward, next_observation, done);
        let update = self.agent.train();

        if let Some(update) = update {
            self.stats.record_update(update.loss, update.epsilon);
        }
        self.total_steps += 1;

        if let Some(progress) = self.progress.as_mut() {
            progress.observation = next_observation;
            progress.reward += reward;
            progress.steps += 1;
            if let Some(update) = update {
                progress.loss_sum += update.loss;
                progress.loss_count += 1;
            }
        }

        let outcome = TickOutcome {
            action,
            reward,
            done,
            loss: update.map(|u| u.loss),
        };
        let summary = done.then(|| self.finish_episode(false));

        Ok((outcome, summary))
    }

    fn start_episode(&mut self) {
        let observation = self.env.reset();
        self.progress = Some(EpisodeProgress::new(observation));
    }

    fn finish_episode(&mut self, interrupted: bool) -> EpisodeSummary {
        let progress = self
            .progress
            .take()
            .unwrap_or_else(|| EpisodeProgress::new(self.env.get_observation()));
        let final_queue = self.env.state().total_vehicles();

        let summary = EpisodeSummary {
            episode: self.episode,
            reward: progress.reward,
            steps: progress.steps,
            final_queue,
            mean_loss: progress.mean_loss(),
            epsilon: self.agent.epsilon(),
            interrupted,
        };

        if interrupted {
            return summary;
        }

        self.stats
            .record_episode(summary.reward, summary.steps, summary.final_queue);
        self.episode += 1;

        info!("{}", summary.log_line());
        if self.episode % self.config.log_frequency == 0 {
            info!(
                "[Episode {}/{}] {}",
                self.episode,
                self.config.num_episodes,
                self.stats.format_summary()
            );
        }

        summary
    }

    /// All configured episodes are done or a stop was requested
    pub fn is_finished(&self) -> bool {
        self.episode >= self.config.num_episodes || self.stop.is_requested()
    }

    /// Intersection as of the last tick
    pub fn state(&self) -> &IntersectionState {
        self.env.state()
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn agent(&self) -> &DqnAgent<B> {
        &self.agent
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Episodes completed so far
    pub fn episodes_completed(&self) -> usize {
        self.episode
    }

    /// Reward accumulated by the episode in progress, if one is running
    pub fn current_reward(&self) -> Option<f32> {
        self.progress.as_ref().map(|p| p.reward)
    }

    fn log_header(&self) {
        let dqn = &self.config.dqn;

        info!("{}", "=".repeat(60));
        info!("DQN Training - Traffic Signal Control");
        info!("{}", "=".repeat(60));
        info!("Episodes: {}", self.config.num_episodes);
        info!(
            "Episode length: {} steps",
            self.config.intersection.max_steps + 1
        );
        match self.config.seed {
            Some(seed) => info!("Seed: {}", seed),
            None => info!("Seed: from entropy"),
        }
        info!("DQN Config:");
        info!("  Learning rate: {}", dqn.learning_rate);
        info!("  Gamma: {}", dqn.gamma);
        info!(
            "  Epsilon: {} -> {} (decay {})",
            dqn.epsilon_start, dqn.epsilon_min, dqn.epsilon_decay
        );
        info!("  Batch size: {}", dqn.batch_size);
        info!("  Replay capacity: {}", dqn.buffer_capacity);
        info!(
            "  Target sync: every {} training steps",
            dqn.update_target_freq
        );
        info!("Logging: every {} episodes", self.config.log_frequency);
        info!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{TrainingBackend, default_device};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn short_config(num_episodes: usize, max_steps: u32) -> TrainConfig {
        TrainConfig {
            num_episodes,
            seed: Some(42),
            intersection: IntersectionConfig::with_max_steps(max_steps),
            ..Default::default()
        }
    }

    #[test]
    fn test_train_config_defaults() {
        let config = TrainConfig::new(1000);
        assert_eq!(config.num_episodes, 1000);
        assert_eq!(config.log_frequency, 10);
        assert_eq!(config.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "num_episodes": 3, "seed": 9, "intersection": {{ "max_steps": 50 }} }}"#
        )
        .unwrap();

        let config = TrainConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.num_episodes, 3);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.intersection.max_steps, 50);
        assert_eq!(config.intersection.lane_capacity, 10);
        assert_eq!(config.dqn, DqnConfig::default());
    }

    #[test]
    fn test_config_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrainConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_malformed_file_fails() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(TrainConfig::from_json_file(file.path()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = short_config(1, 10);
        config.dqn.batch_size = 0;

        assert!(TrainMode::<TrainingBackend>::new(config, default_device()).is_err());
    }

    #[test]
    fn test_seed_derivation_is_deterministic() {
        let config = short_config(1, 10);
        assert_eq!(config.derive_seeds(), config.derive_seeds());

        let (env_seed, agent_seed) = config.derive_seeds().unwrap();
        assert_ne!(env_seed, agent_seed);
    }

    #[test]
    fn test_unseeded_run_uses_entropy() {
        let config = TrainConfig {
            seed: None,
            ..short_config(1, 10)
        };
        assert_eq!(config.derive_seeds(), None);

        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();
        let summary = train_mode.run_episode().unwrap();

        assert_eq!(summary.steps, 11);
        assert!(!summary.interrupted);
    }

    #[test]
    fn test_episode_log_line_counts_from_one() {
        let summary = EpisodeSummary {
            episode: 0,
            reward: -152.34,
            steps: 201,
            final_queue: 12,
            mean_loss: None,
            epsilon: 0.6123,
            interrupted: false,
        };

        assert_eq!(
            summary.log_line(),
            "Episode 1: Total Reward = -152.34, Epsilon = 0.61"
        );
    }

    #[test]
    fn test_stop_signal() {
        let stop = StopSignal::new();
        let handle = stop.clone();
        assert!(!stop.is_requested());

        handle.request();

        assert!(stop.is_requested());
    }

    #[test]
    fn test_run_single_episode() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(short_config(1, 60), default_device()).unwrap();

        let summary = train_mode.run_episode().unwrap();

        assert_eq!(summary.episode, 0);
        assert_eq!(summary.steps, 61);
        assert!(!summary.interrupted);
        assert!(summary.reward <= 0.0);
        assert_eq!(summary.final_queue, train_mode.state().total_vehicles());
        // 61 transitions, training starts once 32 are stored
        assert_eq!(train_mode.agent().steps(), 30);
        assert!(summary.mean_loss.is_some());
        assert_eq!(train_mode.episodes_completed(), 1);
    }

    #[test]
    fn test_tick_reports_episode_end() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(short_config(2, 5), default_device()).unwrap();

        for _ in 0..5 {
            let (outcome, summary) = train_mode.tick().unwrap();
            assert!(!outcome.done);
            assert!(outcome.action < 3);
            assert!(outcome.loss.is_none());
            assert!(summary.is_none());
        }

        let (outcome, summary) = train_mode.tick().unwrap();
        assert!(outcome.done);
        let summary = summary.unwrap();
        assert_eq!(summary.steps, 6);

        // Next tick starts a fresh episode
        train_mode.tick().unwrap();
        assert_eq!(train_mode.state().step_count, 1);
    }

    #[test]
    fn test_run_completes_all_episodes() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(short_config(3, 20), default_device()).unwrap();

        let report = train_mode.run().unwrap();

        assert_eq!(report.episodes_completed, 3);
        assert_eq!(report.episodes.len(), 3);
        assert_eq!(report.total_steps, 63);
        assert!(!report.interrupted);
        assert!(report.final_epsilon < 1.0);
        assert!(report.final_epsilon >= 0.1);
        assert_eq!(train_mode.stats().total_episodes(), 3);
    }

    #[test]
    fn test_stop_before_run_trains_nothing() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(short_config(5, 20), default_device()).unwrap();
        train_mode.stop_signal().request();

        let report = train_mode.run().unwrap();

        assert_eq!(report.episodes_completed, 0);
        assert_eq!(report.total_steps, 0);
    }

    #[test]
    fn test_stop_mid_episode_keeps_completed_ticks() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(short_config(5, 100), default_device()).unwrap();

        for _ in 0..40 {
            train_mode.tick().unwrap();
        }
        train_mode.stop_signal().request();

        assert!(train_mode.is_finished());
        assert_eq!(train_mode.agent().memory().len(), 40);
        assert_eq!(train_mode.agent().steps(), 9);
        assert_eq!(train_mode.state().step_count, 40);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a =
            TrainMode::<TrainingBackend>::new(short_config(1, 20), default_device()).unwrap();
        let mut b =
            TrainMode::<TrainingBackend>::new(short_config(1, 20), default_device()).unwrap();

        // Exploration is fully random at epsilon 1.0, so the trajectories
        // match until the first training step decays it.
        for _ in 0..20 {
            let (outcome_a, _) = a.tick().unwrap();
            let (outcome_b, _) = b.tick().unwrap();
            assert_eq!(outcome_a.action, outcome_b.action);
            assert_eq!(outcome_a.reward, outcome_b.reward);
        }
        assert_eq!(a.state(), b.state());
    }
}
