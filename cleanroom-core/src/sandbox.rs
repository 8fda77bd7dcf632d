//! Clean-room sandbox.
//!
//! In place, the live tree is snapshotted and used directly. Isolated, the
//! committed tree is streamed out of git into a temporary directory and
//! snapshotted in the same pass; everything after that runs against the
//! temporary directory, which is removed on every exit path.

use crate::PipelineError;
use camino::Utf8Path;
use cleanroom_shell::{Cmd, Shell};
use cleanroom_snapshot::{extract_and_snapshot, snapshot_from_archive, snapshot_from_dir};
use cleanroom_types::{Exclusions, Snapshot};
use tracing::info;

/// `git archive` of the committed tree.
pub fn archive_command() -> Cmd {
    Cmd::new("git").args(["archive", "--format=tar", "HEAD"])
}

/// Paths git reports as ignored, relative to the shell root.
///
/// `-z` keeps git from quoting and escaping unusual names.
pub fn ignored_paths(shell: &dyn Shell) -> Result<Vec<String>, PipelineError> {
    let cmd = Cmd::new("git").args([
        "ls-files",
        "--others",
        "--ignored",
        "--exclude-standard",
        "--directory",
        "-z",
    ]);
    let out = shell
        .run(&cmd)
        .map_err(|e| PipelineError::shell("list ignored paths", e))?;
    Ok(out
        .stdout
        .split('\0')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect())
}

/// Snapshot the committed tree without unpacking it.
pub fn snapshot_head(
    shell: &dyn Shell,
    exclusions: &Exclusions,
) -> Result<Snapshot, PipelineError> {
    let mut stream = shell
        .stream(&archive_command())
        .map_err(|e| PipelineError::shell("export HEAD", e))?;
    let snapshot =
        snapshot_from_archive(&mut stream, exclusions).map_err(PipelineError::Snapshot)?;
    stream
        .finish()
        .map_err(|e| PipelineError::shell("export HEAD", e))?;
    Ok(snapshot)
}

/// Establish the working context and run `f` in it.
///
/// `f` receives the shell to use for every later operation and the initial
/// snapshot. A setup failure returns before `f` is called.
pub fn enter<T, F>(
    shell: &dyn Shell,
    isolated: bool,
    exclusions: &Exclusions,
    f: F,
) -> Result<T, PipelineError>
where
    F: FnOnce(&dyn Shell, Snapshot) -> Result<T, PipelineError>,
{
    if !isolated {
        let snapshot =
            snapshot_from_dir(shell.root(), exclusions).map_err(PipelineError::Snapshot)?;
        log_snapshot(&snapshot, shell.root(), false);
        return f(shell, snapshot);
    }

    let temp = shell
        .temp_dir()
        .map_err(|e| PipelineError::shell("create sandbox", e))?;
    let dir = Utf8Path::from_path(temp.path())
        .ok_or_else(|| anyhow::anyhow!("non UTF-8 sandbox path: {}", temp.path().display()))?;
    // Go reports resolved paths; a symlinked temp root would leave them absolute.
    let dir = dir
        .canonicalize_utf8()
        .map_err(|e| anyhow::anyhow!("resolve sandbox path {}: {}", dir, e))?;
    let dir = dir.as_path();

    let mut stream = shell
        .stream(&archive_command())
        .map_err(|e| PipelineError::shell("export HEAD", e))?;
    let snapshot =
        extract_and_snapshot(&mut stream, dir, exclusions).map_err(PipelineError::Snapshot)?;
    stream
        .finish()
        .map_err(|e| PipelineError::shell("export HEAD", e))?;
    log_snapshot(&snapshot, dir, true);

    let inner = shell.rebind(dir);
    let result = f(inner.as_ref(), snapshot);
    drop(inner);
    drop(temp);
    result
}

fn log_snapshot(snapshot: &Snapshot, root: &Utf8Path, isolated: bool) {
    info!(
        root = %root,
        isolated,
        files = snapshot.len(),
        digest = %snapshot.digest(),
        "snapshot taken"
    );
}
