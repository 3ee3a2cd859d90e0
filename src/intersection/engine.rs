use super::{
    action::{Lane, SignalAction, SignalPhase},
    config::IntersectionConfig,
    state::IntersectionState,
};
use crate::error::{TrafficError, TrafficResult};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Information about a step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepInfo {
    /// Vehicles added by this step's spawn batch
    pub vehicles_spawned: usize,
    /// Vehicles that left through the exit boundary
    pub vehicles_exited: usize,
}

/// Result of a simulation step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for this step (for RL training)
    pub reward: f32,
    /// Whether the episode has run past its step limit
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

/// The simulation engine that owns the intersection rules
///
/// The random source is injected so that spawning is reproducible.
pub struct TrafficEngine<R: Rng = StdRng> {
    config: IntersectionConfig,
    rng: R,
}

impl TrafficEngine<StdRng> {
    /// Create an engine whose spawns are fully determined by `seed`
    pub fn seeded(config: IntersectionConfig, seed: u64) -> TrafficResult<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Create an engine seeded from operating system entropy
    pub fn from_entropy(config: IntersectionConfig) -> TrafficResult<Self> {
        Self::new(config, StdRng::from_entropy())
    }
}

impl<R: Rng> TrafficEngine<R> {
    /// Create a new engine with the given configuration and random source
    pub fn new(config: IntersectionConfig, rng: R) -> TrafficResult<Self> {
        config.validate().map_err(TrafficError::InvalidConfig)?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &IntersectionConfig {
        &self.config
    }

    /// Reset the intersection to an empty north-south green phase and run
    /// the initial spawn batch
    pub fn reset(&mut self) -> IntersectionState {
        let mut state = IntersectionState::new();
        self.spawn_vehicles(&mut state);
        state
    }

    /// Execute one step of the simulation
    pub fn step(&mut self, state: &mut IntersectionState, action: SignalAction) -> StepResult {
        state.step_count += 1;

        match action {
            SignalAction::SwitchNs => {
                state.signal = SignalPhase::NsGreen;
                state.phase_time = 0;
            }
            SignalAction::SwitchEw => {
                state.signal = SignalPhase::EwGreen;
                state.phase_time = 0;
            }
            SignalAction::Extend => {
                state.phase_time += 1;
            }
        }

        let vehicles_exited = self.move_vehicles(state);

        let vehicles_spawned = if state.step_count % self.config.spawn_interval == 0 {
            self.spawn_vehicles(state)
        } else {
            0
        };

        let mut reward = -(state.total_vehicles() as f32);
        if action.is_switch() {
            reward -= self.config.switch_penalty;
        }

        StepResult {
            reward,
            terminated: state.step_count > self.config.max_steps,
            info: StepInfo {
                vehicles_spawned,
                vehicles_exited,
            },
        }
    }

    /// Advance vehicles on green lanes and remove those past the exit boundary
    fn move_vehicles(&self, state: &mut IntersectionState) -> usize {
        let mut exited = 0;

        for lane in Lane::ALL {
            let can_move = state.is_green(lane);
            let lane_state = state.lane_mut(lane);

            if can_move {
                lane_state.advance(self.config.stop_line, self.config.advance_step);
            }
            exited += lane_state.remove_exited(self.config.exit_boundary);
        }

        exited
    }

    /// Generate a random batch of arrivals on random lanes
    fn spawn_vehicles(&mut self, state: &mut IntersectionState) -> usize {
        let attempts = self.rng.gen_range(0..=self.config.max_spawn_per_batch);
        let mut spawned = 0;

        for _ in 0..attempts {
            let lane = Lane::ALL[self.rng.gen_range(0..Lane::ALL.len())];
            if self.try_spawn(state, lane) {
                spawned += 1;
            }
        }

        spawned
    }

    /// Queue a vehicle behind the ones already in `lane`; full lanes are skipped
    fn try_spawn(&self, state: &mut IntersectionState, lane: Lane) -> bool {
        let lane_state = state.lane_mut(lane);
        let count = lane_state.count();

        if count >= self.config.lane_capacity {
            return false;
        }

        let position = self.config.stop_line - count as i32 * self.config.spawn_spacing;
        lane_state.push(position);
        true
    }
}
