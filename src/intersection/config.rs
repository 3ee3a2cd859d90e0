use serde::{Deserialize, Serialize};

/// Configuration for the intersection simulation
///
/// Positions are integer distances along a lane. Vehicles queue up to the stop
/// line and leave the simulation once they pass the exit boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionConfig {
    /// Maximum number of vehicles queued in a single lane
    pub lane_capacity: usize,
    /// Vehicles advance only while positioned before this line
    pub stop_line: i32,
    /// Vehicles positioned beyond this boundary exit the simulation
    pub exit_boundary: i32,
    /// Distance a vehicle on a green lane advances per step
    pub advance_step: i32,
    /// Spacing between consecutive spawn positions in a lane
    pub spawn_spacing: i32,
    /// A spawn batch happens every this many steps
    pub spawn_interval: u32,
    /// Upper bound (inclusive) on vehicles generated per spawn batch
    pub max_spawn_per_batch: usize,
    /// The episode is done once the step count exceeds this value
    pub max_steps: u32,

    // Rewards (for RL)
    /// Extra penalty charged for each explicit phase switch
    pub switch_penalty: f32,
    /// Scale applied to `phase_time` in observations
    pub phase_time_scale: f32,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            lane_capacity: 10,
            stop_line: 300,
            exit_boundary: 600,
            advance_step: 5,
            spawn_spacing: 40,
            spawn_interval: 10,
            max_spawn_per_batch: 4,
            max_steps: 200,
            switch_penalty: 0.1,
            phase_time_scale: 0.1,
        }
    }
}

impl IntersectionConfig {
    /// Create a configuration with a custom episode length
    pub fn with_max_steps(max_steps: u32) -> Self {
        Self {
            max_steps,
            ..Default::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.lane_capacity == 0 {
            return Err("lane_capacity must be at least 1".to_string());
        }

        if self.spawn_interval == 0 {
            return Err("spawn_interval must be at least 1".to_string());
        }

        if self.advance_step <= 0 {
            return Err(format!(
                "advance_step must be positive, got {}",
                self.advance_step
            ));
        }

        if self.exit_boundary < self.stop_line {
            return Err(format!(
                "exit_boundary ({}) cannot be before stop_line ({})",
                self.exit_boundary, self.stop_line
            ));
        }

        if self.switch_penalty < 0.0 {
            return Err(format!(
                "switch_penalty must be non-negative, got {}",
                self.switch_penalty
            ));
        }

        Ok(())
    }
}
