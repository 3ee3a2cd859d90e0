//! ML Traffic - adaptive signal control for a four-way intersection
//!
//! This library provides:
//! - Intersection simulation (intersection module)
//! - DQN training infrastructure (rl module)
//! - Training statistics (metrics module)
//! - TUI rendering and input (render, input modules)
//! - Headless and live-visualized training (modes module)

pub mod error;
pub mod input;
pub mod intersection;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod rl;

pub use error::{TrafficError, TrafficResult};
