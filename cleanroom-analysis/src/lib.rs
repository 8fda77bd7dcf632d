//! Static-analysis runner.
//!
//! The analysis itself is delegated to an [`AnalysisEngine`]; this crate only
//! decides which analyzers run, drops findings under excluded paths, and turns
//! what is left into a pass/fail result per module.

mod engine;
mod error;
mod registry;
mod runner;
mod vet;

pub use engine::{Analysis, AnalysisEngine};
pub use error::{AnalysisError, RegistryError};
pub use registry::{Analyzer, Registry};
pub use runner::{collect, run_module};
pub use vet::VetEngine;
