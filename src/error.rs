//! Errors in the library.
use thiserror::Error;

/// Errors raised by the simulation and learning core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrafficError {
    /// An action index outside the signal action space was passed to `step`.
    #[error("invalid action {0}: expected 0 (switch NS), 1 (switch EW) or 2 (extend)")]
    InvalidAction(usize),

    /// A configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for the simulation and learning core.
pub type TrafficResult<T> = Result<T, TrafficError>;
