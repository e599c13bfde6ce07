//! Result classification
//!
//! Stage outcomes are classified as pure functions over the captured
//! evidence, then rendered in the canonical human-readable format.

pub mod classify;
pub mod result;

pub use classify::{StageReport, VerdictClassifier};
pub use result::{ExecutionResult, ResultKind, Stage, StageTiming};
