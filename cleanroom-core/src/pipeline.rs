//! Check and fix pipelines.
//!
//! All command execution goes through the injected [`Shell`] and all analysis
//! through the injected [`AnalysisEngine`]; nothing here spawns a process or
//! reads global state other than the trusted-environment variable.

use crate::mutation::MutationStep;
use crate::sandbox;
use crate::settings::CheckSettings;
use crate::testrun::run_tests;
use crate::tools::ToolCache;
use crate::PipelineError;
use cleanroom_analysis::{AnalysisEngine, collect, run_module};
use cleanroom_edit::{FixOptions, FixOutcome, apply_fixes};
use cleanroom_shell::Shell;
use cleanroom_snapshot::{check_unchanged, discover_modules, snapshot_from_dir};
use cleanroom_types::{Exclusions, Module, Snapshot};
use tracing::{debug, info};

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: Vec<Module>,
    pub isolated: bool,
    /// Digest of the initial snapshot; `None` when no snapshot was taken.
    pub digest: Option<String>,
    /// One entry per module whose files the fix applier changed.
    pub fixes: Vec<FixOutcome>,
    pub tests_run: bool,
}

pub struct Pipeline {
    shell: Box<dyn Shell>,
    engine: Box<dyn AnalysisEngine>,
    settings: CheckSettings,
    tools: ToolCache,
}

impl Pipeline {
    /// The shell is rebound to `settings.repo_root` when it points elsewhere.
    pub fn new(
        shell: Box<dyn Shell>,
        engine: Box<dyn AnalysisEngine>,
        settings: CheckSettings,
    ) -> Self {
        let shell = if shell.root() == settings.repo_root.as_path() {
            shell
        } else {
            debug!(from = %shell.root(), to = %settings.repo_root, "rebinding shell");
            shell.rebind(&settings.repo_root)
        };
        Self {
            shell,
            engine,
            settings,
            tools: ToolCache::new(),
        }
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolCache {
        &self.tools
    }

    /// Fixed names, plus whatever git ignores when the context is untrusted.
    pub fn exclusions(&self) -> Result<Exclusions, PipelineError> {
        let exclusions = Exclusions::with_names(self.settings.excluded_names.iter().cloned());
        if self.settings.is_trusted() {
            return Ok(exclusions);
        }
        let ignored = sandbox::ignored_paths(self.shell.as_ref())?;
        debug!(count = ignored.len(), "ignored paths");
        Ok(exclusions.with_ignored(ignored))
    }

    /// Modules under the repository root.
    pub fn modules(&self) -> Result<Vec<Module>, PipelineError> {
        let exclusions = self.exclusions()?;
        self.discover(self.shell.as_ref(), &exclusions)
    }

    /// Verify the tree: mutating steps must be no-ops, analysis must be
    /// clean and every test cell must pass.
    pub fn check(&self) -> Result<RunSummary, PipelineError> {
        let exclusions = self.exclusions()?;
        let isolated = self.settings.isolated();
        info!(isolated, "check");

        sandbox::enter(self.shell.as_ref(), isolated, &exclusions, |shell, before| {
            let mut summary = RunSummary {
                isolated,
                digest: Some(before.digest()),
                ..RunSummary::default()
            };
            self.run(shell, Some(&before), &exclusions, None, &mut summary)?;
            Ok(summary)
        })
    }

    /// Repair the working tree in place, then verify what is left.
    ///
    /// Mutating steps run without a diff check and fixable diagnostics are
    /// applied before each module's analysis gate. A dry run only previews
    /// the analyzer fixes: no step runs and nothing is written.
    pub fn fix(&self, opts: &FixOptions) -> Result<RunSummary, PipelineError> {
        let exclusions = self.exclusions()?;
        let shell = self.shell.as_ref();
        info!(dry_run = opts.dry_run, "fix");

        let mut summary = RunSummary::default();
        if opts.dry_run {
            summary.modules = self.discover(shell, &exclusions)?;
            for module in &summary.modules {
                if let Some(outcome) = self.fix_module(shell, module, &exclusions, opts)? {
                    summary.fixes.push(outcome);
                }
            }
            return Ok(summary);
        }

        self.run(shell, None, &exclusions, Some(opts), &mut summary)?;
        Ok(summary)
    }

    /// Per-function coverage for one module.
    pub fn coverage(&self, module: &Module) -> Result<String, PipelineError> {
        crate::coverage::coverage(self.shell.as_ref(), module)
    }

    /// Compare the committed tree with the working tree.
    ///
    /// Passes on a clean checkout; otherwise the error lists every
    /// uncommitted change.
    pub fn verify_snapshots(&self) -> Result<(), PipelineError> {
        let exclusions = self.exclusions()?;
        let shell = self.shell.as_ref();
        let head = sandbox::snapshot_head(shell, &exclusions)?;
        let live = snapshot_from_dir(shell.root(), &exclusions).map_err(PipelineError::Snapshot)?;
        info!(
            head = %head.digest(),
            live = %live.digest(),
            "comparing snapshots"
        );
        check_unchanged(Some(&head), &live).map_err(PipelineError::Uncommitted)
    }

    fn discover(
        &self,
        shell: &dyn Shell,
        exclusions: &Exclusions,
    ) -> Result<Vec<Module>, PipelineError> {
        let modules = discover_modules(shell.root(), exclusions, &self.settings.sentinel)
            .map_err(PipelineError::Discovery)?;
        info!(count = modules.len(), "discovered modules");
        for m in &modules {
            debug!(module = %m, "module");
        }
        Ok(modules)
    }

    fn run(
        &self,
        shell: &dyn Shell,
        before: Option<&Snapshot>,
        exclusions: &Exclusions,
        fix: Option<&FixOptions>,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let modules = self.discover(shell, exclusions)?;

        for step in &self.settings.steps {
            info!(step = %step.name, "running step");
            for module in &modules {
                self.run_step(shell, step, module)?;
            }
            if let Some(before) = before {
                let after =
                    snapshot_from_dir(shell.root(), exclusions).map_err(PipelineError::Snapshot)?;
                check_unchanged(Some(before), &after).map_err(|source| {
                    PipelineError::Mutation {
                        step: step.name.clone(),
                        source,
                    }
                })?;
            }
        }

        for module in &modules {
            if let Some(opts) = fix
                && let Some(outcome) = self.fix_module(shell, module, exclusions, opts)?
            {
                summary.fixes.push(outcome);
            }
            run_module(
                self.engine.as_ref(),
                shell,
                module,
                self.settings.analyzers.all(),
                exclusions,
            )?;
        }

        if self.settings.run_tests {
            for module in &modules {
                run_tests(shell, module)?;
            }
            summary.tests_run = true;
        }

        summary.modules = modules;
        Ok(())
    }

    fn fix_module(
        &self,
        shell: &dyn Shell,
        module: &Module,
        exclusions: &Exclusions,
        opts: &FixOptions,
    ) -> Result<Option<FixOutcome>, PipelineError> {
        let fixable = self.settings.analyzers.fixable();
        if fixable.is_empty() {
            return Ok(None);
        }
        let diagnostics = collect(self.engine.as_ref(), shell, module, &fixable, exclusions)?;
        if diagnostics.is_empty() {
            return Ok(None);
        }
        let outcome = apply_fixes(shell.root(), &diagnostics, exclusions, opts).map_err(
            |source| PipelineError::Fix {
                module: module.clone(),
                source,
            },
        )?;
        Ok((!outcome.files_changed.is_empty()).then_some(outcome))
    }

    /// Run one step in one module, installing its tool on first need.
    fn run_step(
        &self,
        shell: &dyn Shell,
        step: &MutationStep,
        module: &Module,
    ) -> Result<(), PipelineError> {
        let Some(cmd) = step.command(module) else {
            return Err(anyhow::anyhow!("step `{}` has an empty command", step.name).into());
        };
        debug!(step = %step.name, module = %module, "step");

        let step_error = |source| PipelineError::Step {
            step: step.name.clone(),
            module: module.clone(),
            source,
        };
        match shell.run(&cmd) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => match &step.tool {
                Some(tool) if tool.program == cmd.program => {
                    self.tools.ensure(shell, tool)?;
                    shell.run(&cmd).map(drop).map_err(step_error)
                }
                _ => Err(step_error(e)),
            },
            Err(e) => Err(step_error(e)),
        }
    }
}
