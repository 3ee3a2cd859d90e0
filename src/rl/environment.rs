use super::observation::{Observation, create_observation};
use crate::error::TrafficResult;
use crate::intersection::{IntersectionConfig, IntersectionState, SignalAction, TrafficEngine};
use rand::{Rng, rngs::StdRng};

/// Intersection environment for reinforcement learning
///
/// Wraps the traffic engine and provides the standard RL interface:
/// - 6-component vector observations
/// - Discrete action space (0: switch NS, 1: switch EW, 2: extend)
/// - `reset` / `step`, with no automatic reset at episode end
pub struct TrafficEnvironment<R: Rng = StdRng> {
    engine: TrafficEngine<R>,
    state: IntersectionState,
}

impl TrafficEnvironment<StdRng> {
    /// Create an environment whose spawns are fully determined by `seed`
    pub fn seeded(config: IntersectionConfig, seed: u64) -> TrafficResult<Self> {
        Ok(Self::from_engine(TrafficEngine::seeded(config, seed)?))
    }

    /// Create an environment seeded from operating system entropy
    pub fn from_entropy(config: IntersectionConfig) -> TrafficResult<Self> {
        Ok(Self::from_engine(TrafficEngine::from_entropy(config)?))
    }
}

impl<R: Rng> TrafficEnvironment<R> {
    /// Create an environment around an existing engine
    pub fn from_engine(mut engine: TrafficEngine<R>) -> Self {
        let state = engine.reset();
        Self { engine, state }
    }

    /// Reset the environment and return the initial observation
    pub fn reset(&mut self) -> Observation {
        self.state = self.engine.reset();
        self.get_observation()
    }

    /// Step the environment with a discrete action index
    ///
    /// Returns `(observation, reward, done)`. An index outside `0..=2`
    /// yields `TrafficError::InvalidAction` and leaves the state untouched.
    pub fn step(&mut self, action_idx: usize) -> TrafficResult<(Observation, f32, bool)> {
        let action = SignalAction::try_from(action_idx)?;
        let result = self.engine.step(&mut self.state, action);

        Ok((self.get_observation(), result.reward, result.terminated))
    }

    /// Get current observation without stepping
    pub fn get_observation(&self) -> Observation {
        create_observation(&self.state, self.engine.config())
    }

    /// Read-only snapshot of the simulation, e.g. for rendering
    pub fn state(&self) -> &IntersectionState {
        &self.state
    }

    pub fn config(&self) -> &IntersectionConfig {
        self.engine.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrafficError;
    use crate::intersection::SignalPhase;

    #[test]
    fn test_environment_creation() {
        let env = TrafficEnvironment::seeded(IntersectionConfig::default(), 0).unwrap();

        assert_eq!(env.state().step_count, 0);
        assert_eq!(env.state().signal, SignalPhase::NsGreen);
    }

    #[test]
    fn test_unseeded_environment_resets() {
        let mut env = TrafficEnvironment::from_entropy(IntersectionConfig::default()).unwrap();

        let obs = env.reset();
        assert_eq!(obs[4], 0.0);
        assert_eq!(obs[5], 0.0);
        assert_eq!(obs[..4].iter().sum::<f32>() as usize, env.state().total_vehicles());

        let (_, reward, done) = env.step(2).unwrap();
        assert!(reward <= 0.0);
        assert!(!done);
    }

    #[test]
    fn test_reset_returns_valid_observation() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::default(), 0).unwrap();

        let obs = env.reset();
        let total: f32 = obs[..4].iter().sum();

        assert!(total <= 4.0);
        assert_eq!(obs[4], 0.0);
        assert_eq!(obs[5], 0.0);
        assert_eq!(total as usize, env.state().total_vehicles());
    }

    #[test]
    fn test_step_with_switch_action() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::default(), 4).unwrap();
        env.reset();

        let (obs, reward, done) = env.step(1).unwrap();

        assert_eq!(obs[4], 1.0);
        assert_eq!(obs[5], 0.0);
        assert!(reward <= -0.1 + 1e-6);
        assert!(!done);
    }

    #[test]
    fn test_extend_scales_phase_time() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::default(), 4).unwrap();
        env.reset();

        env.step(2).unwrap();
        env.step(2).unwrap();
        let (obs, _, _) = env.step(2).unwrap();

        assert!((obs[5] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_action_does_not_mutate() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::default(), 9).unwrap();
        env.reset();
        env.step(2).unwrap();
        let before = env.state().clone();

        let result = env.step(3);

        assert_eq!(result, Err(TrafficError::InvalidAction(3)));
        assert_eq!(env.state(), &before);
        assert!(env.step(usize::MAX).is_err());
        assert_eq!(env.state(), &before);
    }

    #[test]
    fn test_episode_terminates_and_does_not_auto_reset() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::with_max_steps(20), 2).unwrap();
        env.reset();

        let mut steps = 0;
        loop {
            let (_, _, done) = env.step(2).unwrap();
            steps += 1;
            if done {
                break;
            }
        }

        assert_eq!(steps, 21);
        let (_, _, done) = env.step(0).unwrap();
        assert!(done);
        assert_eq!(env.state().step_count, 22);
    }

    #[test]
    fn test_multiple_episodes() {
        let mut env = TrafficEnvironment::seeded(IntersectionConfig::with_max_steps(30), 8).unwrap();

        for _ in 0..2 {
            env.reset();
            let mut done = false;
            while !done {
                let (_, _, terminated) = env.step(0).unwrap();
                done = terminated;
            }
            assert_eq!(env.state().step_count, 31);
        }
    }
}
