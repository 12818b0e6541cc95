//! Tabular reinforcement learning for small, discrete environments
//!
//! Dynamic programming solvers (value and policy iteration) for environments with a known
//! model, and an online Q-learner for environments that can only be stepped.

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Mapping rich observations to table states
pub mod discretize;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

mod error;

/// Exploration policies
pub mod exploration;

/// Testing environments
pub mod gym;

/// Saving and restoring learned tables
pub mod persist;

/// Per-episode training summaries
pub mod report;

/// Replaying a fixed policy in an environment
pub mod rollout;

mod util;

pub use error::{Error, Result};
