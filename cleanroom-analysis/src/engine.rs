use crate::{AnalysisError, Analyzer};
use cleanroom_shell::Shell;
use cleanroom_types::{Diagnostic, Module};

/// Result of loading and analyzing one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Import paths of the packages that were loaded, sorted.
    pub packages: Vec<String>,
    /// Diagnostics with repository-relative locations and edit paths.
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads a module's packages (tests included) and runs analyzers over them.
pub trait AnalysisEngine: Send + Sync {
    fn analyze(
        &self,
        shell: &dyn Shell,
        module: &Module,
        analyzers: &[Analyzer],
    ) -> Result<Analysis, AnalysisError>;
}
