use crate::testrun::TestCell;
use cleanroom_analysis::AnalysisError;
use cleanroom_edit::EditError;
use cleanroom_shell::{CommandFailure, ShellError};
use cleanroom_snapshot::MutationError;
use cleanroom_types::Module;

/// Error type for pipeline results. Exit code 2 = the tree failed
/// verification, 1 = the pipeline itself could not run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("discover modules: {0:#}")]
    Discovery(anyhow::Error),

    #[error("snapshot tree: {0:#}")]
    Snapshot(anyhow::Error),

    #[error("step `{step}`: {source}")]
    Mutation { step: String, source: MutationError },

    #[error("working tree differs from HEAD: {0}")]
    Uncommitted(MutationError),

    #[error("step `{step}` failed in {module}: {source}")]
    Step {
        step: String,
        module: Module,
        source: ShellError,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("fix {module}: {source}")]
    Fix { module: Module, source: EditError },

    #[error("tests failed in {module} ({cell}): {source}")]
    Test {
        module: Module,
        cell: TestCell,
        source: CommandFailure,
    },

    #[error("install {tool}: {message}")]
    ToolInstall { tool: String, message: String },

    #[error("{context}: {source}")]
    Shell {
        context: String,
        #[source]
        source: ShellError,
    },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// True when the tree itself was rejected rather than the run breaking.
    pub fn is_verification_failure(&self) -> bool {
        match self {
            PipelineError::Mutation { .. }
            | PipelineError::Uncommitted(_)
            | PipelineError::Test { .. } => true,
            PipelineError::Analysis(e) => e.is_findings(),
            PipelineError::Fix { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_verification_failure() { 2 } else { 1 }
    }

    pub(crate) fn shell(context: impl Into<String>, source: ShellError) -> Self {
        PipelineError::Shell {
            context: context.into(),
            source,
        }
    }
}
