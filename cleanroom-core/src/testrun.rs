use crate::PipelineError;
use cleanroom_shell::{Cmd, Shell, ShellError};
use cleanroom_types::Module;
use std::fmt;
use tracing::{debug, info};

/// One combination of the race × short test matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCell {
    pub race: bool,
    pub short: bool,
}

/// Cells in execution order: without the race detector first, short before
/// full within each half.
pub const MATRIX: [TestCell; 4] = [
    TestCell {
        race: false,
        short: true,
    },
    TestCell {
        race: false,
        short: false,
    },
    TestCell {
        race: true,
        short: true,
    },
    TestCell {
        race: true,
        short: false,
    },
];

impl TestCell {
    /// `go test` for `module`. Cgo follows the race flag since the race
    /// detector needs it.
    pub fn command(&self, module: &Module) -> Cmd {
        let mut cmd = Cmd::new("go").args([
            "-C",
            module.dir.as_str(),
            "test",
            "-count=1",
            "-shuffle=on",
        ]);
        if self.race {
            cmd = cmd.arg("-race");
        }
        if self.short {
            cmd = cmd.arg("-short");
        }
        cmd.arg("./...")
            .env("CGO_ENABLED", if self.race { "1" } else { "0" })
    }
}

impl fmt::Display for TestCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let race = if self.race { "race" } else { "no race" };
        let short = if self.short { "short" } else { "full" };
        write!(f, "{race}, {short}")
    }
}

/// Run every matrix cell for `module`, stopping at the first failure.
pub fn run_tests(shell: &dyn Shell, module: &Module) -> Result<(), PipelineError> {
    info!(module = %module, "testing");
    for cell in MATRIX {
        debug!(module = %module, cell = %cell, "test cell");
        match shell.run(&cell.command(module)) {
            Ok(_) => {}
            Err(ShellError::Failed(source)) => {
                return Err(PipelineError::Test {
                    module: module.clone(),
                    cell,
                    source,
                });
            }
            Err(e) => return Err(PipelineError::shell(format!("test {module} ({cell})"), e)),
        }
    }
    Ok(())
}
