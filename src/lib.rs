//! codebox: compile and run untrusted snippets in throwaway workspaces
//!
//! Given a language identifier, source text, and optional standard input,
//! codebox writes the source into a fresh per-run directory, compiles it if
//! the language needs that, runs it under a wall-clock bound, classifies
//! the outcome, and removes the directory again.
//!
//! # Architecture
//!
//! ## Execution Core ([`core`])
//! - [`core::executor`]: The `Executor` façade (validation, workspace lifecycle, metrics)
//! - [`core::types`]: Request type and source fingerprinting
//!
//! ## Language Plans ([`judge`])
//! - [`judge::plan`]: Immutable per-language pipeline descriptors
//! - [`judge::languages`]: Built-in python, javascript, c, cpp, java plans
//! - [`judge::registry`]: Lookup by identifier and alias
//! - [`judge::materialize`]: Source naming and writing (Java public type discovery)
//! - [`judge::toolchain`]: Executable resolution and dependency probing
//!
//! ## Execution Control ([`exec`])
//! - [`exec::pipeline`]: Type-state compile-then-run ordering
//! - [`exec::process`]: Bounded child processes with process-group termination
//!
//! ## Result Classification ([`verdict`])
//! - [`verdict::classify`]: Pure stage-outcome classification
//! - [`verdict::result`]: Result kinds and canonical rendering
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Run-scoped directories, released on every path
//! - [`safety::cleanup`]: Permission-restoring recursive removal
//!
//! ## Observability ([`observability`])
//! - [`observability::metrics`]: Per-executor counters and Prometheus export
//!
//! ## Configuration ([`config`])
//! - [`config::settings`]: Timeouts, roots, and environment overrides
//! - [`config::types`]: Error type
//!
//! # Non-isolation
//!
//! Programs run with the caller's privileges. There are no memory, CPU,
//! filesystem, or network restrictions beyond the time bounds.

// Configuration
pub mod config;

// Execution core
pub mod core;

// Language plans
pub mod judge;

// Execution control
pub mod exec;

// Result classification
pub mod verdict;

// Safety & Cleanup
pub mod safety;

// Observability
pub mod observability;

// CLI entrypoint wiring for the codebox binary.
pub mod cli;

pub use config::settings::ExecutorConfig;
pub use config::types::{CodeboxError, Result};
pub use crate::core::{ExecutionRequest, Executor};
pub use verdict::{ExecutionResult, ResultKind, Stage, StageTiming};
