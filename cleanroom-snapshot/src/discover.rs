use crate::relative;
use anyhow::Context;
use camino::Utf8Path;
use cleanroom_types::{Exclusions, Module};
use fs_err as fs;
use std::io;
use tracing::debug;
use walkdir::WalkDir;

/// Find every directory under `root` that directly contains `sentinel`.
///
/// The walk is pre-order with siblings sorted by file name, and never
/// descends into excluded directories. The first read error aborts the
/// whole discovery.
pub fn discover_modules(
    root: &Utf8Path,
    exclusions: &Exclusions,
    sentinel: &str,
) -> anyhow::Result<Vec<Module>> {
    let mut modules = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // The root itself is never excluded.
            e.depth() == 0
                || relative(root.as_std_path(), e.path())
                    .map(|rel| !exclusions.is_excluded(&rel))
                    .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let marker = entry.path().join(sentinel);
        let present = match fs::symlink_metadata(&marker) {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e).context("stat module sentinel"),
        };
        if present {
            let rel = relative(root.as_std_path(), entry.path())?;
            debug!(module = %rel, "found module");
            modules.push(Module::new(rel));
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        for f in files {
            let p = root.join(f);
            fs::create_dir_all(p.parent().expect("parent")).expect("mkdir");
            fs::write(&p, "module x\n").expect("write");
        }
        (temp, root)
    }

    fn dirs(modules: &[Module]) -> Vec<&str> {
        modules.iter().map(|m| m.dir.as_str()).collect()
    }

    #[test]
    fn finds_modules_in_walk_order() {
        let (_t, root) = tree(&[
            "go.mod",
            "tools/go.mod",
            "b/go.mod",
            "a/nested/go.mod",
            "a/x.go",
        ]);
        let found = discover_modules(&root, &Exclusions::default(), "go.mod").unwrap();
        assert_eq!(dirs(&found), vec![".", "a/nested", "b", "tools"]);
    }

    #[test]
    fn skips_fixed_exclusions() {
        let (_t, root) = tree(&[
            "svc/go.mod",
            "vendor/dep/go.mod",
            "svc/testdata/fixture/go.mod",
            ".git/go.mod",
        ]);
        let found = discover_modules(&root, &Exclusions::default(), "go.mod").unwrap();
        assert_eq!(dirs(&found), vec!["svc"]);
    }

    #[test]
    fn skips_ignored_paths() {
        let (_t, root) = tree(&["app/go.mod", "build/gen/go.mod"]);
        let ex = Exclusions::default().with_ignored(["build/"]);
        let found = discover_modules(&root, &ex, "go.mod").unwrap();
        assert_eq!(dirs(&found), vec!["app"]);
    }

    #[test]
    fn sentinel_must_be_direct_child() {
        let (_t, root) = tree(&["lib/sub/go.mod.bak", "lib/README"]);
        let found = discover_modules(&root, &Exclusions::default(), "go.mod").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let (_t, root) = tree(&[]);
        let err = discover_modules(&root.join("nope"), &Exclusions::default(), "go.mod");
        assert!(err.is_err());
    }
}
