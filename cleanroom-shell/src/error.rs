//! Error types for the command-execution port.
//!
//! "Program not found" is kept apart from every other failure because the
//! pipeline recovers from it by installing the missing tool.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// The program could not be located.
    #[error("program not found: {program}")]
    NotFound { program: String },

    /// The program ran and exited unsuccessfully.
    #[error(transparent)]
    Failed(#[from] CommandFailure),

    /// Spawning, piping or temp-file creation failed.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ShellError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShellError::NotFound { .. })
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ShellError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A completed process with a non-zero (or signal) exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub command: String,
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "`{}` exited with status {}", self.command, code)?,
            None => write!(f, "`{}` was terminated by a signal", self.command)?,
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        if !detail.is_empty() {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefers_stderr() {
        let err = ShellError::from(CommandFailure {
            command: "go vet ./...".to_string(),
            code: Some(1),
            stdout: "ignored".to_string(),
            stderr: "no Go files\n".to_string(),
        });
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "`go vet ./...` exited with status 1\nno Go files"
        );
    }

    #[test]
    fn failure_falls_back_to_stdout() {
        let err = CommandFailure {
            command: "go test ./...".to_string(),
            code: None,
            stdout: "--- FAIL: TestX\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "`go test ./...` was terminated by a signal\n--- FAIL: TestX"
        );
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = ShellError::NotFound {
            program: "goimports".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("goimports"));
    }
}
