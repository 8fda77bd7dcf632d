use crate::PipelineError;
use cleanroom_shell::{Cmd, Shell};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// An external tool and the command that installs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Program name as it appears in argv.
    pub program: String,
    pub install: Vec<String>,
}

impl ToolSpec {
    pub fn new<S: AsRef<str>>(program: impl Into<String>, install: &[S]) -> Self {
        Self {
            program: program.into(),
            install: install.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Installs each tool at most once and remembers the outcome.
///
/// A failed install is cached too; later lookups fail without retrying.
#[derive(Debug, Default)]
pub struct ToolCache {
    outcomes: Mutex<HashMap<String, Result<(), String>>>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&self, shell: &dyn Shell, tool: &ToolSpec) -> Result<(), PipelineError> {
        // Held across the install so concurrent callers wait for the first one.
        let mut outcomes = self.outcomes.lock().unwrap_or_else(|p| p.into_inner());
        let outcome = outcomes
            .entry(tool.program.clone())
            .or_insert_with(|| install(shell, tool));
        outcome.clone().map_err(|message| PipelineError::ToolInstall {
            tool: tool.program.clone(),
            message,
        })
    }

    /// Whether an install has been attempted for `program`.
    pub fn attempted(&self, program: &str) -> bool {
        self.outcomes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(program)
    }
}

fn install(shell: &dyn Shell, tool: &ToolSpec) -> Result<(), String> {
    let Some(cmd) = Cmd::from_argv(&tool.install) else {
        return Err("no install command configured".to_string());
    };
    info!(tool = %tool.program, command = %cmd, "installing missing tool");
    shell.run(&cmd).map(drop).map_err(|e| {
        warn!(tool = %tool.program, error = %e, "install failed");
        e.to_string()
    })
}
