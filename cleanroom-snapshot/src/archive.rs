use crate::is_contained;
use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use cleanroom_types::{Exclusions, Snapshot};
use fs_err as fs;
use std::io::Read;
use tracing::debug;

/// Snapshot the regular files of a tar stream.
pub fn snapshot_from_archive<R: Read>(
    reader: R,
    exclusions: &Exclusions,
) -> anyhow::Result<Snapshot> {
    read_archive(reader, exclusions, None)
}

/// Unpack a tar stream into `dest` and snapshot it in the same pass.
///
/// Every entry is written out, excluded ones included; exclusions only decide
/// what lands in the snapshot.
pub fn extract_and_snapshot<R: Read>(
    reader: R,
    dest: &Utf8Path,
    exclusions: &Exclusions,
) -> anyhow::Result<Snapshot> {
    read_archive(reader, exclusions, Some(dest))
}

fn read_archive<R: Read>(
    reader: R,
    exclusions: &Exclusions,
    dest: Option<&Utf8Path>,
) -> anyhow::Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries().context("read archive")? {
        let mut entry = entry.context("read archive entry")?;
        let kind = entry.header().entry_type();
        let rel = entry_path(&entry)?;

        if !kind.is_file() {
            // Directories, symlinks and hard links only matter on disk.
            if let Some(dest) = dest
                && (kind.is_dir() || kind.is_symlink() || kind.is_hard_link())
            {
                entry
                    .unpack_in(dest)
                    .with_context(|| format!("unpack {}", rel))?;
            }
            continue;
        }

        // The header size is not trusted for allocation.
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("read {} from archive", rel))?;

        if let Some(dest) = dest {
            write_entry(dest, &rel, &bytes, entry.header().mode().ok())?;
        }
        if !exclusions.is_excluded(&rel) {
            snapshot.insert_bytes(rel, &bytes);
        }
    }

    debug!(files = snapshot.len(), "read archive");
    Ok(snapshot)
}

fn entry_path<R: Read>(entry: &tar::Entry<'_, R>) -> anyhow::Result<Utf8PathBuf> {
    let path = entry.path().context("archive entry path")?;
    let path = Utf8PathBuf::from_path_buf(path.into_owned())
        .map_err(|p| anyhow::anyhow!("non UTF-8 archive path: {}", p.display()))?;
    let path = match path.strip_prefix("./") {
        Ok(p) => p.to_path_buf(),
        Err(_) => path,
    };
    if !is_contained(&path) {
        bail!("archive entry escapes destination: {}", path);
    }
    Ok(path)
}

fn write_entry(
    dest: &Utf8Path,
    rel: &Utf8Path,
    bytes: &[u8],
    mode: Option<u32>,
) -> anyhow::Result<()> {
    let path = dest.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            fs::set_permissions(&path, std::fs::Permissions::from_mode(mode & 0o777))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
