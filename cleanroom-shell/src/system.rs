//! Process-backed shell.

use crate::{Cmd, CommandFailure, CommandStream, Output, Shell, ShellError};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tempfile::TempDir;
use tracing::debug;

/// Runs programs as child processes of the current process.
#[derive(Debug, Clone)]
pub struct SystemShell {
    root: Utf8PathBuf,
}

impl SystemShell {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn command(&self, cmd: &Cmd) -> Command {
        let mut c = Command::new(&cmd.program);
        c.args(&cmd.args)
            .envs(&cmd.env)
            .current_dir(self.workdir(cmd))
            .stdin(Stdio::null());
        c
    }

    fn workdir(&self, cmd: &Cmd) -> Utf8PathBuf {
        match &cmd.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }
}

fn spawn_error(cmd: &Cmd, err: io::Error) -> ShellError {
    if err.kind() == io::ErrorKind::NotFound {
        ShellError::NotFound {
            program: cmd.program.clone(),
        }
    } else {
        ShellError::io(format!("spawn `{cmd}`"), err)
    }
}

impl Shell for SystemShell {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn rebind(&self, root: &Utf8Path) -> Box<dyn Shell> {
        Box::new(SystemShell::new(root))
    }

    fn run(&self, cmd: &Cmd) -> Result<Output, ShellError> {
        debug!(command = %cmd, root = %self.root, "run");
        let out = self
            .command(cmd)
            .output()
            .map_err(|e| spawn_error(cmd, e))?;

        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        if !out.status.success() {
            return Err(CommandFailure {
                command: cmd.to_string(),
                code: out.status.code(),
                stdout,
                stderr,
            }
            .into());
        }
        Ok(Output { stdout, stderr })
    }

    fn stream(&self, cmd: &Cmd) -> Result<Box<dyn CommandStream>, ShellError> {
        debug!(command = %cmd, root = %self.root, "stream");
        let mut child = self
            .command(cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(cmd, e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ShellError::io(
                format!("pipe stdout of `{cmd}`"),
                io::ErrorKind::BrokenPipe.into(),
            )
        })?;
        // Drain stderr concurrently so a chatty child cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut err| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf);
                buf
            })
        });

        Ok(Box::new(ChildStream {
            command: cmd.to_string(),
            child: Some(child),
            stdout,
            stderr_reader,
        }))
    }

    fn temp_dir(&self) -> Result<TempDir, ShellError> {
        tempfile::Builder::new()
            .prefix("cleanroom-")
            .tempdir()
            .map_err(|e| ShellError::io("create temporary directory", e))
    }
}

struct ChildStream {
    command: String,
    child: Option<Child>,
    stdout: ChildStdout,
    stderr_reader: Option<JoinHandle<String>>,
}

impl Read for ChildStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl CommandStream for ChildStream {
    fn finish(mut self: Box<Self>) -> Result<(), ShellError> {
        // Consume whatever the reader left behind so the child can exit.
        io::copy(&mut self.stdout, &mut io::sink())
            .map_err(|e| ShellError::io(format!("drain stdout of `{}`", self.command), e))?;

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| ShellError::io(format!("wait for `{}`", self.command), e))?;
        let stderr = self
            .stderr_reader
            .take()
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(CommandFailure {
                command: self.command.clone(),
                code: status.code(),
                stdout: String::new(),
                stderr,
            }
            .into())
        }
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell() -> (TempDir, SystemShell) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, SystemShell::new(root))
    }

    #[test]
    fn missing_program_is_not_found() {
        let (_t, sh) = shell();
        let err = sh
            .run(&Cmd::new("cleanroom-definitely-not-a-program"))
            .expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn run_captures_stdout_and_env() {
        let (_t, sh) = shell();
        let out = sh
            .run(
                &Cmd::new("sh")
                    .args(["-c", "printf %s \"$GREETING\""])
                    .env("GREETING", "hello"),
            )
            .expect("run");
        assert_eq!(out.out(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn run_uses_relative_dir_under_root() {
        let (_t, sh) = shell();
        std::fs::create_dir_all(sh.root().join("sub")).expect("mkdir");
        let out = sh.run(&Cmd::new("pwd").dir("sub")).expect("run");
        assert!(out.out().ends_with("/sub"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_failure_with_stderr() {
        let (_t, sh) = shell();
        let err = sh
            .run(&Cmd::new("sh").args(["-c", "echo broken >&2; exit 3"]))
            .expect_err("should fail");
        match err {
            ShellError::Failed(f) => {
                assert_eq!(f.code, Some(3));
                assert_eq!(f.stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stream_reads_stdout_then_reports_status() {
        let (_t, sh) = shell();
        let mut stream = sh
            .stream(&Cmd::new("sh").args(["-c", "printf abc; exit 0"]))
            .expect("stream");
        let mut buf = String::new();
        stream.read_to_string(&mut buf).expect("read");
        assert_eq!(buf, "abc");
        stream.finish().expect("finish");

        let stream = sh
            .stream(&Cmd::new("sh").args(["-c", "echo nope >&2; exit 2"]))
            .expect("stream");
        let err = stream.finish().expect_err("should fail");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn temp_dir_is_removed_on_drop() {
        let (_t, sh) = shell();
        let dir = sh.temp_dir().expect("temp");
        let path = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn rebind_changes_root() {
        let (_t, sh) = shell();
        let other = sh.rebind(Utf8Path::new("/tmp"));
        assert_eq!(other.root(), Utf8Path::new("/tmp"));
    }
}
