use crate::relative;
use anyhow::Context;
use camino::Utf8Path;
use cleanroom_types::{Exclusions, Snapshot};
use fs_err as fs;
use tracing::debug;
use walkdir::WalkDir;

/// Snapshot the working tree under `root` by walking it.
///
/// Only regular files are recorded; symlinks are not followed.
pub fn snapshot_from_dir(root: &Utf8Path, exclusions: &Exclusions) -> anyhow::Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || relative(root.as_std_path(), e.path())
                    .map(|rel| !exclusions.is_excluded(&rel))
                    .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative(root.as_std_path(), entry.path())?;
        let bytes = fs::read(entry.path())?;
        snapshot.insert_bytes(rel, &bytes);
    }

    debug!(root = %root, files = snapshot.len(), "walked tree");
    Ok(snapshot)
}
