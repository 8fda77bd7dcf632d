//! Recording shell for tests and dry runs.
//!
//! Every invocation is recorded. Unscripted commands succeed with empty
//! output. Scripts are keyed by the exact argv.

use crate::{Cmd, CommandFailure, CommandStream, Output, Shell, ShellError};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

/// A recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub dir: Option<Utf8PathBuf>,
    /// Root of the shell the call was made through.
    pub root: Utf8PathBuf,
}

impl Call {
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

type Hook = Arc<dyn Fn(&Utf8Path) + Send + Sync>;

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    outputs: HashMap<Vec<String>, Result<Output, CommandFailure>>,
    streams: HashMap<Vec<String>, Vec<u8>>,
    hooks: HashMap<Vec<String>, Hook>,
    missing: HashSet<String>,
    provides: HashMap<Vec<String>, String>,
}

/// A [`Shell`] that records calls instead of spawning processes.
///
/// Clones (and rebound shells) share the same script and call log.
#[derive(Clone)]
pub struct MockShell {
    root: Utf8PathBuf,
    state: Arc<Mutex<State>>,
}

fn key<S: AsRef<str>>(argv: &[S]) -> Vec<String> {
    argv.iter().map(|s| s.as_ref().to_string()).collect()
}

impl MockShell {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the calls recorded so far.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Script a successful run with the given stdout.
    pub fn respond(&self, argv: &[&str], stdout: &str) -> &Self {
        self.state().outputs.insert(
            key(argv),
            Ok(Output {
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    /// Script a successful run with the given stderr.
    pub fn respond_stderr(&self, argv: &[&str], stderr: &str) -> &Self {
        self.state().outputs.insert(
            key(argv),
            Ok(Output {
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        );
        self
    }

    /// Script a failing run.
    pub fn fail(&self, argv: &[&str], code: i32, stderr: &str) -> &Self {
        let command = argv.join(" ");
        self.state().outputs.insert(
            key(argv),
            Err(CommandFailure {
                command,
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        );
        self
    }

    /// Script the bytes a streamed command produces.
    pub fn stream_bytes(&self, argv: &[&str], bytes: Vec<u8>) -> &Self {
        self.state().streams.insert(key(argv), bytes);
        self
    }

    /// Run `hook` with the resolved working directory whenever `argv` runs.
    pub fn on_run<F>(&self, argv: &[&str], hook: F) -> &Self
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.state().hooks.insert(key(argv), Arc::new(hook));
        self
    }

    /// Make `program` report "not found".
    pub fn missing(&self, program: &str) -> &Self {
        self.state().missing.insert(program.to_string());
        self
    }

    /// Running `install_argv` successfully makes `program` available.
    pub fn provides(&self, install_argv: &[&str], program: &str) -> &Self {
        self.state()
            .provides
            .insert(key(install_argv), program.to_string());
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded calls whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.program() == program)
            .cloned()
            .collect()
    }

    fn record(&self, cmd: &Cmd) -> Result<(), ShellError> {
        let mut state = self.state();
        state.calls.push(Call {
            args: cmd.argv(),
            env: cmd.env.clone(),
            dir: cmd.dir.clone(),
            root: self.root.clone(),
        });
        if state.missing.contains(&cmd.program) {
            return Err(ShellError::NotFound {
                program: cmd.program.clone(),
            });
        }
        Ok(())
    }

    fn workdir(&self, cmd: &Cmd) -> Utf8PathBuf {
        match &cmd.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }
}

impl Shell for MockShell {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn rebind(&self, root: &Utf8Path) -> Box<dyn Shell> {
        Box::new(MockShell {
            root: root.to_path_buf(),
            state: Arc::clone(&self.state),
        })
    }

    fn run(&self, cmd: &Cmd) -> Result<Output, ShellError> {
        self.record(cmd)?;
        let argv = cmd.argv();

        let (scripted, hook) = {
            let state = self.state();
            (state.outputs.get(&argv).cloned(), state.hooks.get(&argv).cloned())
        };
        if let Some(hook) = hook {
            hook(&self.workdir(cmd));
        }

        let result = scripted.unwrap_or_else(|| Ok(Output::default()));
        if result.is_ok() {
            let mut state = self.state();
            if let Some(program) = state.provides.get(&argv).cloned() {
                state.missing.remove(&program);
            }
        }
        result.map_err(ShellError::from)
    }

    fn stream(&self, cmd: &Cmd) -> Result<Box<dyn CommandStream>, ShellError> {
        self.record(cmd)?;
        let bytes = self
            .state()
            .streams
            .get(&cmd.argv())
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MockStream(Cursor::new(bytes))))
    }

    fn temp_dir(&self) -> Result<TempDir, ShellError> {
        tempfile::Builder::new()
            .prefix("cleanroom-mock-")
            .tempdir()
            .map_err(|e| ShellError::io("create temporary directory", e))
    }
}

struct MockStream(Cursor<Vec<u8>>);

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl CommandStream for MockStream {
    fn finish(self: Box<Self>) -> Result<(), ShellError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unscripted_commands_succeed_and_are_recorded() {
        let sh = MockShell::new("/repo");
        let out = sh
            .run(&Cmd::new("go").args(["test", "./..."]).env("CGO_ENABLED", "0"))
            .expect("run");
        assert_eq!(out, Output::default());

        let calls = sh.calls_to("go");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["go", "test", "./..."]);
        assert_eq!(calls[0].env.get("CGO_ENABLED").map(String::as_str), Some("0"));
        assert_eq!(calls[0].root, Utf8PathBuf::from("/repo"));
    }

    #[test]
    fn scripted_output_and_failure() {
        let sh = MockShell::new("/repo");
        sh.respond(&["git", "rev-parse", "HEAD"], "abc123\n")
            .fail(&["go", "vet"], 1, "boom");

        let out = sh.run(&Cmd::new("git").args(["rev-parse", "HEAD"])).unwrap();
        assert_eq!(out.out(), "abc123");

        let err = sh.run(&Cmd::new("go").arg("vet")).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn missing_program_becomes_available_after_install() {
        let sh = MockShell::new("/repo");
        sh.missing("goimports").provides(
            &["go", "install", "golang.org/x/tools/cmd/goimports@latest"],
            "goimports",
        );

        assert!(sh.run(&Cmd::new("goimports")).unwrap_err().is_not_found());
        sh.run(&Cmd::new("go").args(["install", "golang.org/x/tools/cmd/goimports@latest"]))
            .unwrap();
        assert!(sh.run(&Cmd::new("goimports")).is_ok());
    }

    #[test]
    fn rebound_shell_shares_log() {
        let sh = MockShell::new("/repo");
        let inner = sh.rebind(Utf8Path::new("/sandbox"));
        inner.run(&Cmd::new("go").arg("version")).unwrap();

        let calls = sh.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].root, Utf8PathBuf::from("/sandbox"));
    }

    #[test]
    fn hook_receives_workdir() {
        let sh = MockShell::new("/repo");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sh.on_run(&["gofmt", "-w", "."], move |dir| {
            sink.lock().unwrap().push(dir.to_path_buf());
        });
        sh.run(&Cmd::new("gofmt").args(["-w", "."]).dir("lib")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Utf8PathBuf::from("/repo/lib")]);
    }

    #[test]
    fn stream_returns_scripted_bytes() {
        let sh = MockShell::new("/repo");
        sh.stream_bytes(&["git", "archive"], b"data".to_vec());
        let mut s = sh.stream(&Cmd::new("git").arg("archive")).unwrap();
        let mut buf = Vec::new();
        s.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"data");
        s.finish().unwrap();
    }
}
