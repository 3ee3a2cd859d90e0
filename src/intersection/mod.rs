//! Core intersection simulation
//!
//! This module contains the signal state machine, vehicle queues and reward
//! model without any I/O, rendering or learning dependencies.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

// Re-export commonly used types
pub use action::{Lane, SignalAction, SignalPhase};
pub use config::IntersectionConfig;
pub use engine::{StepInfo, StepResult, TrafficEngine};
pub use state::{IntersectionState, LaneState};
