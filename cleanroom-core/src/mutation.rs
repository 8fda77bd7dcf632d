//! Mutating steps: programs that rewrite the tree (tidy, formatters) and are
//! expected to be no-ops on a correct tree.

use crate::tools::ToolSpec;
use cleanroom_shell::Cmd;
use cleanroom_types::Module;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStep {
    pub name: String,
    /// Program and arguments, run from each module directory.
    pub argv: Vec<String>,
    /// Tool to install if the program is missing.
    #[serde(default)]
    pub tool: Option<ToolSpec>,
}

impl MutationStep {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, argv: &[S]) -> Self {
        Self {
            name: name.into(),
            argv: argv.iter().map(|s| s.as_ref().to_string()).collect(),
            tool: None,
        }
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tool = Some(tool);
        self
    }

    /// `go mod tidy`, then `goimports -w .`.
    pub fn go_defaults() -> Vec<Self> {
        vec![
            Self::new("go mod tidy", &["go", "mod", "tidy"]),
            Self::new("goimports", &["goimports", "-w", "."]).with_tool(ToolSpec::new(
                "goimports",
                &["go", "install", "golang.org/x/tools/cmd/goimports@latest"],
            )),
        ]
    }

    /// The invocation for `module`, or `None` for an empty argv.
    pub fn command(&self, module: &Module) -> Option<Cmd> {
        Cmd::from_argv(&self.argv).map(|c| c.dir(module.dir()))
    }
}
