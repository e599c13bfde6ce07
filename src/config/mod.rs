//! Configuration
//!
//! Error taxonomy for unexpected faults and the executor settings that
//! control timeouts, workspace placement, and toolchain lookup.

pub mod settings;
pub mod types;
