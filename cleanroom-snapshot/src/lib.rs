//! Tree inspection for cleanroom.
//!
//! - [`discover_modules`]: find module roots under a directory.
//! - [`snapshot_from_archive`] / [`extract_and_snapshot`]: capture a tree from
//!   a tar stream (the committed state).
//! - [`snapshot_from_dir`]: capture a tree by walking the working directory.
//! - [`check_unchanged`]: compare two snapshots and fail with a full report.
//!
//! Both snapshot producers apply the same exclusions and the same content
//! normalization, so they agree on an unmodified tree.

mod archive;
mod diff;
mod discover;
mod walk;

pub use archive::{extract_and_snapshot, snapshot_from_archive};
pub use diff::{MutationError, check_unchanged, render_diff};
pub use discover::discover_modules;
pub use walk::snapshot_from_dir;

use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::path::Path;

/// Repository-relative form of `path`, which must lie under `root`.
fn relative(root: &Path, path: &Path) -> anyhow::Result<Utf8PathBuf> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    Utf8PathBuf::from_path_buf(rel.to_path_buf())
        .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))
}

/// Whether `rel` is a plain relative path with no `..` or root components.
fn is_contained(rel: &Utf8Path) -> bool {
    rel.components()
        .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
}
