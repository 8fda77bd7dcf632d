//! Clap-free settings for the check and fix pipelines.

use crate::mutation::MutationStep;
use camino::Utf8PathBuf;
use cleanroom_analysis::Registry;
use cleanroom_types::{FIXED_EXCLUSIONS, MODULE_SENTINEL, TRUSTED_ENV};

/// Where checks run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SandboxMode {
    /// In place when the trusted-environment variable is set, isolated otherwise.
    #[default]
    Auto,
    InPlace,
    Isolated,
}

#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub repo_root: Utf8PathBuf,
    pub sandbox: SandboxMode,

    /// Variable whose non-empty presence marks a trusted, already-clean context.
    pub trusted_env: String,
    /// Overrides the environment lookup when set.
    pub trusted: Option<bool>,

    pub sentinel: String,
    pub excluded_names: Vec<String>,

    pub analyzers: Registry,
    pub steps: Vec<MutationStep>,
    pub run_tests: bool,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            repo_root: Utf8PathBuf::from("."),
            sandbox: SandboxMode::Auto,
            trusted_env: TRUSTED_ENV.to_string(),
            trusted: None,
            sentinel: MODULE_SENTINEL.to_string(),
            excluded_names: FIXED_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            analyzers: Registry::go_vet(),
            steps: MutationStep::go_defaults(),
            run_tests: true,
        }
    }
}

impl CheckSettings {
    pub fn is_trusted(&self) -> bool {
        self.trusted.unwrap_or_else(|| {
            std::env::var_os(&self.trusted_env).is_some_and(|v| !v.is_empty())
        })
    }

    /// Whether `check` should run in a temporary copy of the committed tree.
    pub fn isolated(&self) -> bool {
        match self.sandbox {
            SandboxMode::Auto => !self.is_trusted(),
            SandboxMode::InPlace => false,
            SandboxMode::Isolated => true,
        }
    }
}
