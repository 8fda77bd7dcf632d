use crate::PipelineError;
use anyhow::Context;
use camino::Utf8PathBuf;
use cleanroom_shell::{Cmd, Shell};
use cleanroom_types::Module;
use tracing::info;

/// Per-function coverage report for `module`, as printed by `go tool cover`.
///
/// The profile lives in a scoped temporary directory that is removed on
/// return, whether or not the tests passed.
pub fn coverage(shell: &dyn Shell, module: &Module) -> Result<String, PipelineError> {
    info!(module = %module, "measuring coverage");
    let temp = shell
        .temp_dir()
        .map_err(|e| PipelineError::shell("create coverage directory", e))?;
    let profile = Utf8PathBuf::from_path_buf(temp.path().join("cover.out"))
        .map_err(|p| anyhow::anyhow!("non UTF-8 temp path: {}", p.display()))
        .context("coverage profile")?;

    let test = Cmd::new("go").args([
        "-C",
        module.dir.as_str(),
        "test",
        "-coverprofile",
        profile.as_str(),
        "./...",
    ]);
    shell
        .run(&test)
        .map_err(|e| PipelineError::shell(format!("coverage tests for {module}"), e))?;

    let func = format!("-func={profile}");
    let report = Cmd::new("go")
        .args(["tool", "cover", func.as_str()])
        .dir(module.dir());
    let out = shell
        .run(&report)
        .map_err(|e| PipelineError::shell(format!("coverage report for {module}"), e))?;
    Ok(out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleanroom_shell::MockShell;

    #[test]
    fn runs_tests_then_report_with_same_profile() {
        let sh = MockShell::new("/repo");
        let out = coverage(&sh, &Module::new("svc")).unwrap();
        assert_eq!(out, "");

        let calls = sh.calls_to("go");
        assert_eq!(calls.len(), 2);
        let profile = calls[0].args[5].clone();
        assert!(profile.ends_with("cover.out"));
        assert_eq!(calls[1].args[3], format!("-func={profile}"));
        assert_eq!(calls[1].dir.as_ref().map(|d| d.as_str()), Some("svc"));

        // Scoped directory is gone once the call returns.
        assert!(!std::path::Path::new(&profile).parent().unwrap().exists());
    }
}
