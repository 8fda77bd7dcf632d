use camino::Utf8Path;
use cleanroom_types::Snapshot;
use diffy::PatchFormatter;
use std::collections::BTreeSet;

/// A step changed a tree that was expected to stay put.
#[derive(Debug, thiserror::Error)]
#[error("unexpected changes to the tree:\n{report}")]
pub struct MutationError {
    /// Every deleted, changed and added path, in path order.
    pub report: String,
}

/// Compare `after` against `before`, if there is a `before`.
///
/// With no `before` there is nothing to compare and the check passes.
pub fn check_unchanged(before: Option<&Snapshot>, after: &Snapshot) -> Result<(), MutationError> {
    let Some(before) = before else {
        return Ok(());
    };
    let report = render_diff(before, after);
    if report.is_empty() {
        Ok(())
    } else {
        Err(MutationError { report })
    }
}

/// Render one record per differing path, walking the sorted union of paths.
///
/// Records are `deleted: <path>`, `added: <path>`, or `changed: <path>`
/// followed by a unified diff of the content.
pub fn render_diff(before: &Snapshot, after: &Snapshot) -> String {
    let paths: BTreeSet<&Utf8Path> = before.paths().chain(after.paths()).collect();
    let formatter = PatchFormatter::new();
    let mut out = String::new();

    for path in paths {
        match (before.get(path), after.get(path)) {
            (Some(_), None) => out.push_str(&format!("deleted: {path}\n")),
            (None, Some(_)) => out.push_str(&format!("added: {path}\n")),
            (Some(old), Some(new)) if old != new => {
                out.push_str(&format!("changed: {path}\n"));
                out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));
                let patch = diffy::create_patch(old, new);
                let text = formatter.fmt_patch(&patch).to_string();
                // Drop diffy's own `--- original` / `+++ modified` header.
                out.extend(text.splitn(3, '\n').skip(2));
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn snap(files: &[(&str, &str)]) -> Snapshot {
        let mut s = Snapshot::new();
        for (p, c) in files {
            s.insert_bytes(*p, c.as_bytes());
        }
        s
    }

    #[test]
    fn absent_before_always_passes() {
        let after = snap(&[("a.go", "package a\n")]);
        assert!(check_unchanged(None, &after).is_ok());
    }

    #[test]
    fn single_addition_is_the_whole_report() {
        let before = snap(&[("go.mod", "module x\n")]);
        let after = snap(&[("go.mod", "module x\n"), ("go.sum", "h1:abc\n")]);
        let err = check_unchanged(Some(&before), &after).unwrap_err();
        assert_eq!(err.report, "added: go.sum\n");
    }

    #[test]
    fn reports_every_kind_in_path_order() {
        let before = snap(&[("a.go", "package a\n"), ("b.go", "x\ny\n")]);
        let after = snap(&[("b.go", "x\nz\n"), ("c.go", "package c\n")]);
        let report = render_diff(&before, &after);
        assert_eq!(
            report,
            "deleted: a.go\n\
             changed: b.go\n\
             --- a/b.go\n\
             +++ b/b.go\n\
             @@ -1,2 +1,2 @@\n \
             x\n\
             -y\n\
             +z\n\
             added: c.go\n"
        );
    }

    #[test]
    fn error_message_carries_report() {
        let before = snap(&[("a.go", "1\n")]);
        let after = snap(&[]);
        let err = check_unchanged(Some(&before), &after).unwrap_err();
        assert!(err.to_string().ends_with("deleted: a.go\n"));
    }

    proptest! {
        #[test]
        fn diff_of_identical_snapshots_is_empty(
            files in proptest::collection::btree_map("[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.go", ".{0,40}", 0..8)
        ) {
            let mut s = Snapshot::new();
            for (p, c) in &files {
                s.insert_bytes(p.as_str(), c.as_bytes());
            }
            prop_assert_eq!(render_diff(&s, &s.clone()), "");
            prop_assert!(check_unchanged(Some(&s), &s).is_ok());
        }
    }
}
