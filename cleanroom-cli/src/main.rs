mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use cleanroom_analysis::VetEngine;
use cleanroom_core::{FixOptions, Pipeline, PipelineError, RunSummary};
use cleanroom_shell::SystemShell;
use cleanroom_types::Module;
use config::{CliOverrides, ConfigMerger};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cleanroom")]
#[command(version, about = "Clean-room verification for multi-module Go repositories")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the tree: steps are no-ops, analysis is clean, tests pass.
    Check(CheckArgs),

    /// Apply formatters and analyzer fixes in place, then verify.
    Fix(FixArgs),

    /// List module directories, one per line.
    Modules(CommonArgs),

    /// Print per-function coverage for one module.
    Cover(CoverArgs),

    /// Fail if the working tree differs from HEAD.
    VerifySnapshot(CommonArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Repository root.
    #[arg(long, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Extra directory name to exclude (repeatable).
    #[arg(long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Analyzer to run (repeatable); all registered analyzers by default.
    #[arg(long = "analyzer", value_name = "NAME")]
    analyzers: Vec<String>,

    /// Skip the test matrix.
    #[arg(long)]
    no_tests: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Run directly in the working tree.
    #[arg(long, conflicts_with = "isolated")]
    in_place: bool,

    /// Run in a temporary export of HEAD.
    #[arg(long)]
    isolated: bool,
}

#[derive(Debug, Args)]
struct FixArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Print the analyzer fixes as a patch without writing anything.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct CoverArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Module directory, relative to the repository root.
    module: Utf8PathBuf,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<PipelineError>()
                .map_or(1, PipelineError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Check(args) => {
            let overrides = CliOverrides {
                in_place: args.in_place,
                isolated: args.isolated,
                ..run_overrides(&args.run)
            };
            let pipeline = build_pipeline(&args.run.common.repo_root, &overrides)?;
            let summary = pipeline.check()?;
            print_summary("check", &summary);
        }

        Command::Fix(args) => {
            let overrides = run_overrides(&args.run);
            let pipeline = build_pipeline(&args.run.common.repo_root, &overrides)?;
            let opts = FixOptions {
                dry_run: args.dry_run,
            };
            let summary = pipeline.fix(&opts)?;
            if opts.dry_run {
                for outcome in &summary.fixes {
                    print!("{}", outcome.patch);
                }
            } else {
                for outcome in &summary.fixes {
                    for file in &outcome.files_changed {
                        println!("fixed: {}", file);
                    }
                }
                print_summary("fix", &summary);
            }
        }

        Command::Modules(args) => {
            let pipeline = build_pipeline(&args.repo_root, &common_overrides(&args))?;
            for module in pipeline.modules()? {
                println!("{}", module);
            }
        }

        Command::Cover(args) => {
            let overrides = common_overrides(&args.common);
            let pipeline = build_pipeline(&args.common.repo_root, &overrides)?;
            let report = pipeline.coverage(&Module::new(args.module))?;
            print!("{}", report);
        }

        Command::VerifySnapshot(args) => {
            let pipeline = build_pipeline(&args.repo_root, &common_overrides(&args))?;
            pipeline.verify_snapshots()?;
            println!("working tree matches HEAD");
        }
    }

    Ok(())
}

fn common_overrides(args: &CommonArgs) -> CliOverrides {
    CliOverrides {
        exclude: args.exclude.clone(),
        ..CliOverrides::default()
    }
}

fn run_overrides(args: &RunArgs) -> CliOverrides {
    CliOverrides {
        analyzers: args.analyzers.clone(),
        no_tests: args.no_tests,
        ..common_overrides(&args.common)
    }
}

fn build_pipeline(repo_root: &Utf8Path, overrides: &CliOverrides) -> anyhow::Result<Pipeline> {
    // Analyzer positions are absolute; they are made relative against this.
    let repo_root = repo_root
        .canonicalize_utf8()
        .with_context(|| format!("resolve repository root {}", repo_root))?;
    let file_config =
        config::load_or_default(&repo_root).context("load cleanroom.toml config")?;
    let settings = ConfigMerger::new(file_config)
        .merge(overrides)
        .into_settings(repo_root.clone())?;
    info!(
        repo_root = %repo_root,
        sandbox = ?settings.sandbox,
        steps = settings.steps.len(),
        "settings"
    );

    Ok(Pipeline::new(
        Box::new(SystemShell::new(repo_root.clone())),
        Box::new(VetEngine::new()),
        settings,
    ))
}

fn print_summary(action: &str, summary: &RunSummary) {
    let context = if summary.isolated {
        "isolated"
    } else {
        "in place"
    };
    println!(
        "{}: ok, {} module(s) verified {}{}",
        action,
        summary.modules.len(),
        context,
        if summary.tests_run { "" } else { ", tests skipped" }
    );
    if let Some(digest) = &summary.digest {
        println!("initial snapshot: {}", digest);
    }
}
