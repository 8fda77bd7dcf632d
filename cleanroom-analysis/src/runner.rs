use crate::{AnalysisEngine, AnalysisError, Analyzer};
use cleanroom_shell::Shell;
use cleanroom_types::{Diagnostic, Exclusions, Location, Module};
use std::collections::HashMap;
use tracing::{debug, info};

/// Analyze `module` and return the diagnostics that survive exclusion.
///
/// Exclusions are applied here whatever the engine already filtered, so the
/// result does not depend on which analyzers honour them. A diagnostic
/// reported more than once (a package and its test variant) is kept once,
/// at its first position, with the union of its fixes.
pub fn collect(
    engine: &dyn AnalysisEngine,
    shell: &dyn Shell,
    module: &Module,
    analyzers: &[Analyzer],
    exclusions: &Exclusions,
) -> Result<Vec<Diagnostic>, AnalysisError> {
    let analysis = engine.analyze(shell, module, analyzers)?;
    let total = analysis.diagnostics.len();
    let mut kept: Vec<Diagnostic> = Vec::new();
    let mut seen: HashMap<(Location, String, String), usize> = HashMap::new();
    for diag in analysis.diagnostics {
        if exclusions.is_excluded(&diag.location.file) {
            continue;
        }
        let key = (
            diag.location.clone(),
            diag.message.clone(),
            diag.analyzer.clone(),
        );
        match seen.get(&key) {
            Some(&at) => {
                let first = &mut kept[at];
                for fix in diag.fixes {
                    if !first.fixes.contains(&fix) {
                        first.fixes.push(fix);
                    }
                }
            }
            None => {
                seen.insert(key, kept.len());
                kept.push(diag);
            }
        }
    }
    debug!(
        module = %module,
        packages = analysis.packages.len(),
        total,
        kept = kept.len(),
        "analysis collected"
    );
    Ok(kept)
}

/// Analyze `module` and fail with every remaining diagnostic, if any.
pub fn run_module(
    engine: &dyn AnalysisEngine,
    shell: &dyn Shell,
    module: &Module,
    analyzers: &[Analyzer],
    exclusions: &Exclusions,
) -> Result<(), AnalysisError> {
    info!(module = %module, analyzers = analyzers.len(), "analyzing");
    let diagnostics = collect(engine, shell, module, analyzers, exclusions)?;
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::Findings {
            module: module.clone(),
            diagnostics,
        })
    }
}
