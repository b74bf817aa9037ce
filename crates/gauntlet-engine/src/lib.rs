//! Gauntlet engine
//!
//! The layer executor: runs the four tournament layers of a session over
//! its event's projects and keeps the session state machine in step.
//! - `execute_layer` evaluates one layer and commits it atomically
//! - `run_remaining` drives a session to COMPLETED
//! - `reset_session` returns a session to PENDING or deletes it

pub mod error;
pub mod evaluate;
pub mod executor;
pub mod outcome;

pub use error::{EngineError, Result};
pub use evaluate::evaluate_project;
pub use executor::LayerExecutor;
pub use outcome::{LayerOutcome, ResetMode};
