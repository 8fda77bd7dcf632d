use cleanroom_shell::ShellError;
use cleanroom_types::{Diagnostic, Module};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The module's packages could not be loaded or an analyzer crashed.
    #[error("load {module}: {message}")]
    Load { module: Module, message: String },

    /// The engine produced output that could not be decoded.
    #[error("decode analysis output for {module}")]
    Parse {
        module: Module,
        #[source]
        source: serde_json::Error,
    },

    /// Analysis ran and reported problems.
    #[error(
        "{module}: {count} diagnostic(s)\n{list}",
        count = .diagnostics.len(),
        list = render(.diagnostics)
    )]
    Findings {
        module: Module,
        diagnostics: Vec<Diagnostic>,
    },

    /// The engine could not be started.
    #[error("run analysis for {module}")]
    Shell {
        module: Module,
        #[source]
        source: ShellError,
    },
}

impl AnalysisError {
    /// Findings are a verdict on the code; everything else is a tool failure.
    pub fn is_findings(&self) -> bool {
        matches!(self, AnalysisError::Findings { .. })
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("analyzer registered twice: {0}")]
    Duplicate(String),
    #[error("unknown analyzer: {0}")]
    Unknown(String),
}
