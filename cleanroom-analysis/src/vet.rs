//! `go vet -json` adapter.
//!
//! With `-json`, vet exits zero when it merely finds problems and prints one
//! JSON object per package on stderr, each preceded by a `# <pkg>` comment:
//!
//! ```text
//! # example.com/svc
//! {
//!   "example.com/svc": {
//!     "printf": [ { "posn": "/repo/svc/a.go:3:2", "message": "...",
//!                   "suggested_fixes": [ { "message": "...",
//!                     "edits": [ { "filename": "...", "start": 10, "end": 12, "new": "" } ] } ] } ],
//!     "lostcancel": { "error": "..." }
//!   }
//! }
//! ```
//!
//! A non-zero exit means the packages did not load.

use crate::{Analysis, AnalysisEngine, AnalysisError, Analyzer};
use camino::{Utf8Path, Utf8PathBuf};
use cleanroom_shell::{Cmd, Shell, ShellError};
use cleanroom_types::{Diagnostic, Location, Module, SuggestedFix, TextEdit};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct VetEngine;

impl VetEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn command(module: &Module, analyzers: &[Analyzer]) -> Cmd {
        Cmd::new("go")
            .args(["-C", module.dir.as_str(), "vet", "-json"])
            .args(analyzers.iter().map(|a| format!("-{}", a.name)))
            .arg("./...")
    }
}

impl AnalysisEngine for VetEngine {
    fn analyze(
        &self,
        shell: &dyn Shell,
        module: &Module,
        analyzers: &[Analyzer],
    ) -> Result<Analysis, AnalysisError> {
        let cmd = Self::command(module, analyzers);
        let output = match shell.run(&cmd) {
            Ok(out) => out,
            Err(ShellError::Failed(failure)) => {
                return Err(AnalysisError::Load {
                    module: module.clone(),
                    message: failure.to_string(),
                });
            }
            Err(source) => {
                return Err(AnalysisError::Shell {
                    module: module.clone(),
                    source,
                });
            }
        };

        let analysis = parse(&output.stderr, shell.root()).map_err(|e| match e {
            ParseFailure::Json(source) => AnalysisError::Parse {
                module: module.clone(),
                source,
            },
            ParseFailure::Analyzer {
                package,
                analyzer,
                error,
            } => AnalysisError::Load {
                module: module.clone(),
                message: format!("{analyzer} failed on {package}: {error}"),
            },
        })?;

        debug!(
            module = %module,
            packages = analysis.packages.len(),
            diagnostics = analysis.diagnostics.len(),
            "vet finished"
        );
        Ok(analysis)
    }
}

type VetTree = BTreeMap<String, BTreeMap<String, AnalyzerOutput>>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnalyzerOutput {
    Diagnostics(Vec<JsonDiagnostic>),
    Failed { error: String },
}

#[derive(Debug, Deserialize)]
struct JsonDiagnostic {
    posn: String,
    message: String,
    #[serde(default)]
    suggested_fixes: Vec<JsonFix>,
}

#[derive(Debug, Deserialize)]
struct JsonFix {
    message: String,
    #[serde(default)]
    edits: Vec<JsonEdit>,
}

#[derive(Debug, Deserialize)]
struct JsonEdit {
    filename: String,
    start: usize,
    end: usize,
    #[serde(default)]
    new: String,
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    Analyzer {
        package: String,
        analyzer: String,
        error: String,
    },
}

/// Decode vet's stderr, resolving paths against `root`.
fn parse(stderr: &str, root: &Utf8Path) -> Result<Analysis, ParseFailure> {
    let json: String = stderr
        .lines()
        .filter(|l| !l.starts_with('#') && !l.starts_with("go: "))
        .collect::<Vec<_>>()
        .join("\n");

    let mut packages = BTreeSet::new();
    let mut diagnostics = Vec::new();

    for tree in serde_json::Deserializer::from_str(&json).into_iter::<VetTree>() {
        let tree = tree.map_err(ParseFailure::Json)?;
        for (package, by_analyzer) in tree {
            for (analyzer, output) in by_analyzer {
                match output {
                    AnalyzerOutput::Failed { error } => {
                        return Err(ParseFailure::Analyzer {
                            package,
                            analyzer,
                            error,
                        });
                    }
                    AnalyzerOutput::Diagnostics(list) => {
                        diagnostics.extend(list.into_iter().map(|d| convert(d, &analyzer, root)));
                    }
                }
            }
            packages.insert(package);
        }
    }

    Ok(Analysis {
        packages: packages.into_iter().collect(),
        diagnostics,
    })
}

fn convert(d: JsonDiagnostic, analyzer: &str, root: &Utf8Path) -> Diagnostic {
    Diagnostic {
        location: position(&d.posn, root),
        message: d.message,
        analyzer: analyzer.to_string(),
        fixes: d
            .suggested_fixes
            .into_iter()
            .map(|f| SuggestedFix {
                message: f.message,
                edits: f
                    .edits
                    .into_iter()
                    .map(|e| {
                        let file = relative(&e.filename, root);
                        TextEdit::new(file, e.start, e.end, e.new.as_bytes())
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Parse `file:line:col`; a position without line/column keeps the whole
/// string as the file name.
fn position(posn: &str, root: &Utf8Path) -> Location {
    let mut parts = posn.rsplitn(3, ':');
    let col = parts.next().and_then(|s| s.parse().ok());
    let line = parts.next().and_then(|s| s.parse().ok());
    match (parts.next(), line, col) {
        (Some(file), Some(line), Some(col)) => Location::new(relative(file, root), line, col),
        _ => Location::new(relative(posn, root), 0, 0),
    }
}

fn relative(file: &str, root: &Utf8Path) -> Utf8PathBuf {
    let path = Utf8Path::new(file);
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
