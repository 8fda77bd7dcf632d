//! Configuration file loading for cleanroom.
//!
//! Discovers and loads `cleanroom.toml` from the repository root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use cleanroom_analysis::Registry;
use cleanroom_core::{CheckSettings, MutationStep, SandboxMode};
use cleanroom_types::{FIXED_EXCLUSIONS, MODULE_SENTINEL, TRUSTED_ENV};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "cleanroom.toml";

/// Top-level configuration from cleanroom.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanroomConfig {
    pub sandbox: SandboxConfig,
    pub modules: ModulesConfig,
    pub analysis: AnalysisConfig,
    pub test: TestConfig,

    /// Mutating steps; replaces the built-in `go mod tidy` / `goimports` pair.
    pub steps: Option<Vec<MutationStep>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeConfig {
    #[default]
    Auto,
    InPlace,
    Isolated,
}

impl From<ModeConfig> for SandboxMode {
    fn from(m: ModeConfig) -> Self {
        match m {
            ModeConfig::Auto => SandboxMode::Auto,
            ModeConfig::InPlace => SandboxMode::InPlace,
            ModeConfig::Isolated => SandboxMode::Isolated,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    pub mode: ModeConfig,

    /// Variable marking a trusted context (default `CI`).
    pub trusted_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesConfig {
    /// Module marker file (default `go.mod`).
    pub sentinel: Option<String>,

    /// Extra directory names to exclude, on top of `.git`, `vendor`, `testdata`.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Analyzers to run. Empty means every registered analyzer.
    pub analyzers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub enabled: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Discover the cleanroom.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(repo_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = repo_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a cleanroom.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<CleanroomConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<CleanroomConfig> {
    let config: CleanroomConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from repo root, or return default if not found.
pub fn load_or_default(repo_root: &Utf8Path) -> anyhow::Result<CleanroomConfig> {
    match discover_config(repo_root) {
        Some(path) => load_config(&path),
        None => Ok(CleanroomConfig::default()),
    }
}

/// Flags that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub in_place: bool,
    pub isolated: bool,
    pub exclude: Vec<String>,
    pub analyzers: Vec<String>,
    pub no_tests: bool,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub sandbox: SandboxMode,
    pub trusted_env: String,
    pub sentinel: String,
    /// Fixed names, then config file names, then CLI names; no duplicates.
    pub exclude: Vec<String>,
    pub analyzers: Vec<String>,
    pub steps: Vec<MutationStep>,
    pub run_tests: bool,
}

impl MergedConfig {
    pub fn into_settings(self, repo_root: Utf8PathBuf) -> anyhow::Result<CheckSettings> {
        let analyzers = Registry::go_vet()
            .select(self.analyzers.as_slice())
            .context("select analyzers")?;
        Ok(CheckSettings {
            repo_root,
            sandbox: self.sandbox,
            trusted_env: self.trusted_env,
            trusted: None,
            sentinel: self.sentinel,
            excluded_names: self.exclude,
            analyzers,
            steps: self.steps,
            run_tests: self.run_tests,
        })
    }
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: CleanroomConfig,
}

impl ConfigMerger {
    pub fn new(config: CleanroomConfig) -> Self {
        Self { config }
    }

    /// CLI list flags extend the config file lists; CLI mode flags and
    /// `--no-tests` override the file.
    pub fn merge(self, cli: &CliOverrides) -> MergedConfig {
        let sandbox = if cli.in_place {
            SandboxMode::InPlace
        } else if cli.isolated {
            SandboxMode::Isolated
        } else {
            self.config.sandbox.mode.into()
        };

        let mut exclude: Vec<String> = FIXED_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
        extend_unique(&mut exclude, &self.config.modules.exclude);
        extend_unique(&mut exclude, &cli.exclude);

        let mut analyzers = self.config.analysis.analyzers.clone();
        extend_unique(&mut analyzers, &cli.analyzers);

        MergedConfig {
            sandbox,
            trusted_env: self
                .config
                .sandbox
                .trusted_env
                .unwrap_or_else(|| TRUSTED_ENV.to_string()),
            sentinel: self
                .config
                .modules
                .sentinel
                .unwrap_or_else(|| MODULE_SENTINEL.to_string()),
            exclude,
            analyzers,
            steps: self.config.steps.unwrap_or_else(MutationStep::go_defaults),
            run_tests: self.config.test.enabled && !cli.no_tests,
        }
    }
}

fn extend_unique(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[sandbox]
mode = "in-place"
trusted_env = "BUILDKITE"

[modules]
sentinel = "go.work"
exclude = ["third_party"]

[analysis]
analyzers = ["printf", "assign"]

[test]
enabled = false

[[steps]]
name = "gofmt"
argv = ["gofmt", "-w", "."]

[[steps]]
name = "goimports"
argv = ["goimports", "-w", "."]
tool = { program = "goimports", install = ["go", "install", "golang.org/x/tools/cmd/goimports@latest"] }
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.sandbox.mode, ModeConfig::InPlace);
        assert_eq!(config.sandbox.trusted_env.as_deref(), Some("BUILDKITE"));
        assert_eq!(config.modules.sentinel.as_deref(), Some("go.work"));
        assert_eq!(config.modules.exclude, vec!["third_party"]);
        assert_eq!(config.analysis.analyzers, vec!["printf", "assign"]);
        assert!(!config.test.enabled);

        let steps = config.steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].tool.is_none());
        assert_eq!(steps[1].tool.as_ref().unwrap().program, "goimports");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.sandbox.mode, ModeConfig::Auto);
        assert!(config.modules.exclude.is_empty());
        assert!(config.test.enabled);
        assert!(config.steps.is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(parse_config("[sandbox]\nmood = \"auto\"\n").is_err());
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        assert!(discover_config(&root).is_none());
        let config = load_or_default(&root).unwrap();
        assert!(config.steps.is_none());
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), "[sandbox\n").unwrap();
        let err = load_or_default(&root).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_defaults_merge() {
        let merged = ConfigMerger::new(CleanroomConfig::default()).merge(&CliOverrides::default());
        assert_eq!(merged.sandbox, SandboxMode::Auto);
        assert_eq!(merged.trusted_env, "CI");
        assert_eq!(merged.sentinel, "go.mod");
        assert_eq!(merged.exclude, vec![".git", "vendor", "testdata"]);
        assert_eq!(merged.steps, MutationStep::go_defaults());
        assert!(merged.run_tests);
    }

    #[test]
    fn test_cli_extends_lists_and_overrides_flags() {
        let config = parse_config(
            r#"
[sandbox]
mode = "isolated"

[modules]
exclude = ["third_party", "vendor"]

[analysis]
analyzers = ["printf"]
"#,
        )
        .unwrap();
        let cli = CliOverrides {
            in_place: true,
            exclude: vec!["gen".to_string(), "third_party".to_string()],
            analyzers: vec!["assign".to_string()],
            no_tests: true,
            ..CliOverrides::default()
        };

        let merged = ConfigMerger::new(config).merge(&cli);
        assert_eq!(merged.sandbox, SandboxMode::InPlace);
        assert_eq!(
            merged.exclude,
            vec![".git", "vendor", "testdata", "third_party", "gen"]
        );
        assert_eq!(merged.analyzers, vec!["printf", "assign"]);
        assert!(!merged.run_tests);

        let settings = merged.into_settings(Utf8PathBuf::from("/repo")).unwrap();
        let names: Vec<&str> = settings.analyzers.names().collect();
        assert_eq!(names, vec!["assign", "printf"]);
    }

    #[test]
    fn test_unknown_analyzer_is_an_error() {
        let cli = CliOverrides {
            analyzers: vec!["nosuchpass".to_string()],
            ..CliOverrides::default()
        };
        let merged = ConfigMerger::new(CleanroomConfig::default()).merge(&cli);
        let err = merged.into_settings(Utf8PathBuf::from(".")).unwrap_err();
        assert!(format!("{err:#}").contains("nosuchpass"));
    }
}
