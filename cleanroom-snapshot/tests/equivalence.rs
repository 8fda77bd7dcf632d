//! Archive-based and live-walk snapshots of the same tree must agree.

use camino::{Utf8Path, Utf8PathBuf};
use cleanroom_snapshot::{
    discover_modules, extract_and_snapshot, render_diff, snapshot_from_archive, snapshot_from_dir,
};
use cleanroom_types::Exclusions;
use fs_err as fs;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const TREE: &[(&str, &[u8])] = &[
    ("go.mod", b"module example.com/root\n\ngo 1.22\n"),
    ("main.go", b"package main\r\n\r\nfunc main() {}\r\n"),
    ("internal/util/util.go", b"package util\n"),
    ("internal/util/testdata/case.golden", b"golden\n"),
    ("tools/go.mod", b"module example.com/tools\n"),
    ("tools/gen.go", b"package tools\n"),
    ("vendor/modules.txt", b"# vendored\n"),
    ("assets/blob.bin", &[0xff, 0xfe, b'\r', b'\n', 0x00]),
];

fn write_tree(root: &Utf8Path) {
    for (path, bytes) in TREE {
        let p = root.join(path);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, bytes).unwrap();
    }
}

fn archive_of(root: &Utf8Path) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, _) in TREE {
        builder
            .append_path_with_name(root.join(path), path)
            .unwrap();
    }
    builder.into_inner().unwrap()
}

fn temp_root() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn archive_and_walk_agree_on_unmodified_tree() {
    let (_t, root) = temp_root();
    write_tree(&root);
    let excl = Exclusions::default();

    let live = snapshot_from_dir(&root, &excl).unwrap();
    let archived = snapshot_from_archive(archive_of(&root).as_slice(), &excl).unwrap();

    assert_eq!(render_diff(&archived, &live), "");
    assert_eq!(archived, live);
    assert_eq!(archived.digest(), live.digest());
    assert_eq!(live.len(), 6);
}

#[test]
fn extracted_copy_walks_to_the_same_snapshot() {
    let (_src_t, src) = temp_root();
    write_tree(&src);
    let (_dst_t, dst) = temp_root();
    let excl = Exclusions::default();

    let during = extract_and_snapshot(archive_of(&src).as_slice(), &dst, &excl).unwrap();
    let after = snapshot_from_dir(&dst, &excl).unwrap();
    assert_eq!(during, after);

    let modules = discover_modules(&dst, &excl, "go.mod").unwrap();
    let dirs: Vec<&str> = modules.iter().map(|m| m.dir.as_str()).collect();
    assert_eq!(dirs, vec![".", "tools"]);
}

#[test]
fn live_edit_shows_up_as_changed() {
    let (_t, root) = temp_root();
    write_tree(&root);
    let excl = Exclusions::default();
    let archived = snapshot_from_archive(archive_of(&root).as_slice(), &excl).unwrap();

    fs::write(root.join("tools/gen.go"), "package tools\n\nvar X = 1\n").unwrap();
    let live = snapshot_from_dir(&root, &excl).unwrap();

    let report = render_diff(&archived, &live);
    assert!(report.starts_with("changed: tools/gen.go\n"));
    assert!(report.contains("+var X = 1"));
}
