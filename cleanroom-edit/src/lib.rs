//! Fix applier.
//!
//! Collects the edits of every suggested fix, groups them per file and
//! applies them in descending offset order, so an edit that has not been
//! applied yet is never shifted by one that has.
//!
//! Work happens in two phases. All files are read and edited in memory
//! first; nothing is written unless every file's edits are consistent.

mod error;

pub use error::{ConflictError, EditError, EditResult};

use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cleanroom_types::{Diagnostic, Exclusions, TextEdit};
use diffy::PatchFormatter;
use fs_err as fs;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Compute the outcome and patch without touching the tree.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixOutcome {
    /// Files whose content changed, sorted.
    pub files_changed: Vec<Utf8PathBuf>,
    /// Distinct edits applied across all files.
    pub edits_applied: usize,
    /// Unified diff of every change.
    pub patch: String,
}

/// Apply every suggested fix of the non-excluded `diagnostics` under `root`.
///
/// Edit paths are relative to `root`. Identical edits proposed more than once
/// are applied once.
pub fn apply_fixes(
    root: &Utf8Path,
    diagnostics: &[Diagnostic],
    exclusions: &Exclusions,
    opts: &FixOptions,
) -> EditResult<FixOutcome> {
    let mut pending: BTreeMap<Utf8PathBuf, Vec<TextEdit>> = BTreeMap::new();
    for diag in diagnostics {
        if exclusions.is_excluded(&diag.location.file) {
            continue;
        }
        for fix in &diag.fixes {
            for edit in &fix.edits {
                if exclusions.is_excluded(&edit.file) {
                    continue;
                }
                pending.entry(edit.file.clone()).or_default().push(edit.clone());
            }
        }
    }

    if let Some(file) = pending.keys().find(|f| !is_contained(f)) {
        return Err(ConflictError::OutsideRoot { file: file.clone() }.into());
    }

    // Phase 1: read and edit in memory.
    let mut changes = Vec::new();
    let mut edits_applied = 0;
    for (file, edits) in pending {
        let path = root.join(&file);
        let before = fs::read(&path).with_context(|| format!("read {}", path))?;
        let planned = plan_edits(&file, before.len(), edits)?;
        edits_applied += planned.len();
        let after = splice(&before, &planned);
        if after != before {
            changes.push((file, before, after));
        }
    }

    let patch = render_patch(&changes);

    // Phase 2: write.
    if !opts.dry_run {
        for (file, _, after) in &changes {
            let path = root.join(file);
            fs::write(&path, after).with_context(|| format!("write {}", path))?;
            debug!(file = %file, "applied fixes");
        }
    }

    let files_changed: Vec<Utf8PathBuf> = changes.into_iter().map(|(f, _, _)| f).collect();
    info!(
        files = files_changed.len(),
        edits = edits_applied,
        dry_run = opts.dry_run,
        "fixes applied"
    );

    Ok(FixOutcome {
        files_changed,
        edits_applied,
        patch,
    })
}

/// Apply `edits` to one file's content.
///
/// The edits are validated exactly as [`apply_fixes`] validates them.
pub fn apply_edits(
    file: &Utf8Path,
    content: &[u8],
    edits: Vec<TextEdit>,
) -> Result<Vec<u8>, ConflictError> {
    let planned = plan_edits(file, content.len(), edits)?;
    Ok(splice(content, &planned))
}

/// Relative, with no component that climbs out of the root.
fn is_contained(rel: &Utf8Path) -> bool {
    rel.components()
        .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
}

/// Deduplicate, validate and order edits for one file of `len` bytes.
///
/// The result is sorted by descending `(start, end)`. For an insertion at the
/// start of a replaced range, the replacement therefore goes first and the
/// inserted text ends up in front of it.
fn plan_edits(
    file: &Utf8Path,
    len: usize,
    mut edits: Vec<TextEdit>,
) -> Result<Vec<TextEdit>, ConflictError> {
    edits.sort_by(|a, b| {
        (a.start, a.end, &a.new_text).cmp(&(b.start, b.end, &b.new_text))
    });
    edits.dedup_by(|a, b| a.start == b.start && a.end == b.end && a.new_text == b.new_text);

    let mut prev: Option<&TextEdit> = None;
    for edit in &edits {
        if edit.start > edit.end || edit.end > len {
            return Err(ConflictError::OutOfRange {
                file: file.to_path_buf(),
                range: edit.start..edit.end,
                len,
            });
        }
        if let Some(p) = prev {
            let both_insert_here = p.is_insertion() && edit.is_insertion() && p.start == edit.start;
            if edit.start < p.end || both_insert_here {
                return Err(ConflictError::Overlap {
                    file: file.to_path_buf(),
                    first: p.start..p.end,
                    second: edit.start..edit.end,
                });
            }
        }
        prev = Some(edit);
    }

    edits.reverse();
    Ok(edits)
}

/// Apply edits already in descending order.
fn splice(content: &[u8], descending: &[TextEdit]) -> Vec<u8> {
    let mut buf = content.to_vec();
    for edit in descending {
        buf.splice(edit.start..edit.end, edit.new_text.iter().copied());
    }
    buf
}

fn render_patch(changes: &[(Utf8PathBuf, Vec<u8>, Vec<u8>)]) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, before, after) in changes {
        let old = String::from_utf8_lossy(before);
        let new = String::from_utf8_lossy(after);

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(&old, &new);
        let text = formatter.fmt_patch(&patch).to_string();
        out.extend(text.splitn(3, '\n').skip(2));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
