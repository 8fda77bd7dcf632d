//! Command-execution port.
//!
//! The pipeline never spawns processes directly. Everything goes through a
//! [`Shell`], which is bound to a root directory and can be rebound to
//! another one (the clean-room sandbox relies on this).
//!
//! - [`SystemShell`] runs real processes.
//! - [`MockShell`] records calls and returns scripted results, for tests and
//!   for embedding hosts that want a dry run.

mod cmd;
mod error;
pub mod mock;
mod system;

pub use cmd::{Cmd, Output};
pub use error::{CommandFailure, ShellError};
pub use mock::{Call, MockShell};
pub use system::SystemShell;

use camino::Utf8Path;
use std::io::Read;
use tempfile::TempDir;

/// A program's stdout, readable while the program runs.
pub trait CommandStream: Read + Send {
    /// Wait for the program to exit and report its status.
    fn finish(self: Box<Self>) -> Result<(), ShellError>;
}

/// Runs programs relative to a root directory.
pub trait Shell: Send + Sync {
    /// Directory that relative paths and command working dirs resolve against.
    fn root(&self) -> &Utf8Path;

    /// A shell of the same kind bound to `root`.
    fn rebind(&self, root: &Utf8Path) -> Box<dyn Shell>;

    /// Run to completion and capture output. A non-zero exit is an error.
    fn run(&self, cmd: &Cmd) -> Result<Output, ShellError>;

    /// Start a program and hand back its stdout as a stream.
    fn stream(&self, cmd: &Cmd) -> Result<Box<dyn CommandStream>, ShellError>;

    /// Create a scoped temporary directory, removed when dropped.
    fn temp_dir(&self) -> Result<TempDir, ShellError>;
}
