//! Live visualization of training
//!
//! Trains the agent exactly as headless mode does, one tick per timer
//! interval, while drawing the intersection in the terminal. The agent keeps
//! learning on screen, episode after episode, until the configured number of
//! episodes is reached or the user quits.
//!
//! # Controls
//!
//! - Space: Pause/unpause
//! - 1-4: Speed control (1=slow, 2=normal, 3=fast, 4=max)
//! - Q/Esc/Ctrl+C: Quit
//!
//! # Example
//!
//! ```rust,ignore
//! use ml_traffic::modes::{TrainConfig, VisualizeMode};
//! use ml_traffic::rl::{TrainingBackend, default_device};
//!
//! let mut visualize_mode = VisualizeMode::<TrainingBackend>::new(TrainConfig::default(), default_device())?;
//! visualize_mode.run().await?;
//! ```

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use log::LevelFilter;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{Stderr, stderr},
    time::Duration,
};
use tokio::time::{Interval, MissedTickBehavior, interval};

use super::train::{StopSignal, TrainConfig, TrainMode, TrainingReport};
use crate::input::{InputHandler, KeyAction};
use crate::render::{Renderer, TrainingStatus};

/// Visualization speed settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationSpeed {
    /// Slow: 2 Hz (500ms per tick)
    Slow,
    /// Normal: ~30 Hz (33ms per tick)
    Normal,
    /// Fast: 100 Hz (10ms per tick)
    Fast,
    /// Max: 1ms per tick, bounded by how fast a training step runs
    Max,
}

impl VisualizationSpeed {
    /// Speed for a preset key, 1 (slowest) to 4 (fastest)
    fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Slow),
            2 => Some(Self::Normal),
            3 => Some(Self::Fast),
            4 => Some(Self::Max),
            _ => None,
        }
    }

    /// Get the tick interval for this speed
    fn tick_interval(&self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(500),
            Self::Normal => Duration::from_millis(33),
            Self::Fast => Duration::from_millis(10),
            Self::Max => Duration::from_millis(1),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "Slow",
            Self::Normal => "Normal",
            Self::Fast => "Fast",
            Self::Max => "Max",
        }
    }
}

/// Visualization mode: live training in the terminal
pub struct VisualizeMode<B: AutodiffBackend> {
    trainer: TrainMode<B>,

    renderer: Renderer,

    input: InputHandler,

    stop: StopSignal,

    /// Whether training is paused
    paused: bool,

    /// Current tick speed
    speed: VisualizationSpeed,

    /// Reward of the last finished episode, shown while the next one starts
    last_reward: f32,
}

impl<B: AutodiffBackend> VisualizeMode<B> {
    /// Create a new visualization mode around a fresh training run
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        let renderer = Renderer::new(&config.intersection);
        let trainer = TrainMode::new(config, device)?;
        let stop = trainer.stop_signal();

        Ok(Self {
            trainer,
            renderer,
            input: InputHandler::new(),
            stop,
            paused: false,
            speed: VisualizationSpeed::Normal,
            last_reward: 0.0,
        })
    }

    /// Handle for requesting a stop from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the visualization loop
    ///
    /// Sets up the terminal, trains while drawing, and restores the terminal
    /// on exit. Logging is muted while the alternate screen is active.
    pub async fn run(&mut self) -> Result<TrainingReport> {
        let previous_level = log::max_level();
        log::set_max_level(LevelFilter::Off);

        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        let result = self.run_visualization_loop(&mut terminal).await;

        let cleanup = self.cleanup_terminal(&mut terminal);
        log::set_max_level(previous_level);
        cleanup?;

        result
    }

    /// Main visualization loop
    async fn run_visualization_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<TrainingReport> {
        let mut event_stream = EventStream::new();

        let mut tick_timer = interval(self.speed.tick_interval());
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Render at 30 FPS
        let mut render_timer = interval(Duration::from_millis(33));
        render_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut episodes = Vec::new();
        let mut total_steps = 0;
        let mut quit = false;

        loop {
            tokio::select! {
                // Handle keyboard input
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        quit = self.handle_event(event, &mut tick_timer);
                    }
                }

                // Training tick
                _ = tick_timer.tick() => {
                    if !self.paused && !self.trainer.is_finished() {
                        let (_, summary) = self.trainer.tick()?;
                        total_steps += 1;
                        if let Some(summary) = summary {
                            self.last_reward = summary.reward;
                            episodes.push(summary);
                        }
                    }
                }

                // Render frame
                _ = render_timer.tick() => {
                    let status = self.status();
                    terminal.draw(|frame| {
                        self.renderer.render(frame, self.trainer.state(), &status);
                    }).context("Failed to draw frame")?;
                }

                // Ctrl+C
                _ = tokio::signal::ctrl_c() => {
                    quit = true;
                }
            }

            if quit || self.stop.is_requested() {
                self.stop.request();
                break;
            }
        }

        let agent = self.trainer.agent();
        Ok(TrainingReport {
            episodes_completed: self.trainer.episodes_completed(),
            total_steps,
            training_steps: agent.steps(),
            final_epsilon: agent.epsilon(),
            interrupted: self.trainer.episodes_completed() < self.trainer.config().num_episodes,
            episodes,
        })
    }

    /// Handle keyboard events; returns true when the user asked to quit
    fn handle_event(&mut self, event: Event, tick_timer: &mut Interval) -> bool {
        let Event::Key(key) = event else {
            return false;
        };
        // Only process key press events
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match self.input.handle_key_event(key) {
            KeyAction::Quit => return true,
            KeyAction::TogglePause => self.paused = !self.paused,
            KeyAction::SetSpeed(level) => {
                if let Some(speed) = VisualizationSpeed::from_level(level) {
                    self.change_speed(speed, tick_timer);
                }
            }
            KeyAction::None => {}
        }

        false
    }

    /// Change the visualization speed
    fn change_speed(&mut self, new_speed: VisualizationSpeed, tick_timer: &mut Interval) {
        self.speed = new_speed;
        *tick_timer = interval(self.speed.tick_interval());
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    /// Header figures for the current frame
    fn status(&self) -> TrainingStatus {
        let agent = self.trainer.agent();
        let total_episodes = self.trainer.config().num_episodes;

        TrainingStatus {
            episode: (self.trainer.episodes_completed() + 1).min(total_episodes),
            total_episodes,
            reward: self.trainer.current_reward().unwrap_or(self.last_reward),
            epsilon: agent.epsilon(),
            buffer_len: agent.memory().len(),
            buffer_capacity: agent.memory().capacity(),
            speed: self.speed.as_str(),
            paused: self.paused,
            finished: self.trainer.is_finished(),
        }
    }

    /// Cleanup terminal state
    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}
