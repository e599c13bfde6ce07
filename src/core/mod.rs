//! Language-agnostic execution core.
//!
//! The façade owns request validation, workspace lifecycle, and metrics.
//! Language-specific naming and commands live in judge plans.

pub mod executor;
pub mod types;

pub use executor::Executor;
pub use types::ExecutionRequest;
