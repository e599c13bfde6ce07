//! Execution control
//!
//! Runs a materialized compilation unit through its compile and run steps
//! with type-state enforcement, bounding every child process in time.

pub mod pipeline;
pub mod process;

pub use pipeline::{Compiled, Materialized, Pipeline, Step};
pub use process::{KillReport, ProcessOutput, SpawnOutcome, StageCommand};
