//! Reinforcement learning for the signal controller
//!
//! Provides:
//! - 6-component observations (queue lengths, signal phase, scaled phase time)
//! - An RL environment interface over the traffic engine
//! - Bounded experience replay
//! - A Q-network and a DQN agent with a periodically synced target network

pub mod backend;
pub mod buffer;
pub mod config;
pub mod dqn;
pub mod environment;
pub mod network;
pub mod observation;

pub use backend::{TrainingBackend, default_device};
pub use buffer::{ReplayBuffer, Transition, TransitionBatch};
pub use config::DqnConfig;
pub use dqn::{DqnAgent, TrainStep};
pub use environment::TrafficEnvironment;
pub use network::{QNetwork, QNetworkConfig};
pub use observation::{OBSERVATION_DIM, Observation, create_observation, observations_to_tensor};
