//! DQN hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Configuration for the DQN agent
///
/// # Example
///
/// ```rust
/// use ml_traffic::rl::DqnConfig;
///
/// let config = DqnConfig {
///     learning_rate: 5e-4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Learning rate for the Adam optimizer
    ///
    /// Default: 1e-3
    pub learning_rate: f64,

    /// Discount factor for future rewards (gamma)
    ///
    /// Default: 0.99
    pub gamma: f32,

    /// Exploration probability before any training step
    ///
    /// Default: 1.0
    pub epsilon_start: f64,

    /// Floor for the exploration probability
    ///
    /// Default: 0.1
    pub epsilon_min: f64,

    /// Multiplicative decay applied to epsilon after every training step
    ///
    /// Default: 0.995
    pub epsilon_decay: f64,

    /// Minibatch size sampled from replay memory
    ///
    /// Default: 32
    pub batch_size: usize,

    /// Replay memory capacity
    ///
    /// Default: 10000
    pub buffer_capacity: usize,

    /// Copy online weights into the target network every N training steps
    ///
    /// Default: 100
    pub update_target_freq: usize,

    /// Widths of the two hidden layers
    ///
    /// Default: [64, 32]
    pub hidden_sizes: [usize; 2],
}

impl DqnConfig {
    /// Create a new configuration with default hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }

        if !(0.0..=1.0).contains(&self.epsilon_min) {
            return Err(format!(
                "epsilon_min must be in [0, 1], got {}",
                self.epsilon_min
            ));
        }

        if !(self.epsilon_min..=1.0).contains(&self.epsilon_start) {
            return Err(format!(
                "epsilon_start must be in [epsilon_min, 1], got {}",
                self.epsilon_start
            ));
        }

        if self.epsilon_decay <= 0.0 || self.epsilon_decay > 1.0 {
            return Err(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            ));
        }

        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }

        if self.update_target_freq == 0 {
            return Err("update_target_freq must be at least 1".to_string());
        }

        if self.hidden_sizes.contains(&0) {
            return Err("hidden layer widths must be at least 1".to_string());
        }

        if self.batch_size > self.buffer_capacity {
            return Err(format!(
                "batch_size ({}) cannot exceed buffer_capacity ({})",
                self.batch_size, self.buffer_capacity
            ));
        }

        Ok(())
    }
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.1,
            epsilon_decay: 0.995,
            batch_size: 32,
            buffer_capacity: 10_000,
            update_target_freq: 100,
            hidden_sizes: [64, 32],
        }
    }
}
