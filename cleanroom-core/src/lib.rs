//! Embeddable clean-room verification pipeline.
//!
//! This crate is clap-free: hosts build a [`CheckSettings`], inject a
//! [`Shell`](cleanroom_shell::Shell) and an
//! [`AnalysisEngine`](cleanroom_analysis::AnalysisEngine), and call
//! [`Pipeline::check`] or [`Pipeline::fix`].
//!
//! A check runs, in order:
//! 1. sandbox setup (in place, or an isolated export of `HEAD`)
//! 2. module discovery
//! 3. mutating steps, each followed by a diff against the initial snapshot
//! 4. static analysis per module
//! 5. the race × short test matrix per module

mod coverage;
mod error;
pub mod mutation;
mod pipeline;
pub mod sandbox;
pub mod settings;
pub mod testrun;
pub mod tools;

pub use error::PipelineError;
pub use mutation::MutationStep;
pub use pipeline::{Pipeline, RunSummary};
pub use settings::{CheckSettings, SandboxMode};
pub use testrun::{MATRIX, TestCell};
pub use tools::{ToolCache, ToolSpec};

pub use cleanroom_edit::{FixOptions, FixOutcome};
