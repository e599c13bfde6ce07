//! Language plans.
//!
//! The execution core stays language-agnostic. Plans describe how each
//! language names its source file and which compile/run commands to use;
//! the materializer writes sources and the toolchain resolves executables.

pub mod languages;
pub mod materialize;
pub mod plan;
pub mod registry;
pub mod toolchain;

pub use materialize::{materialize, MaterializationError, MaterializeError};
pub use plan::{CommandTemplate, CompilationUnit, LanguagePlan, SourceNaming};
pub use registry::PlanRegistry;
pub use toolchain::Toolchain;
