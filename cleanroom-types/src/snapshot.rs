use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A path-keyed capture of normalized file contents.
///
/// Content is decoded as UTF-8 (lossily) and CRLF line endings are folded to
/// LF on insertion, so every producer that feeds the same bytes through
/// [`Snapshot::insert_bytes`] yields an equal snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<Utf8PathBuf, String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bytes(&mut self, path: impl Into<Utf8PathBuf>, bytes: &[u8]) {
        self.files.insert(path.into(), normalize(bytes));
    }

    pub fn get(&self, path: &Utf8Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.keys().map(Utf8PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// SHA-256 over the sorted `(path, content)` pairs, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.files {
            hasher.update(path.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(content.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

fn normalize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn crlf_is_folded_to_lf() {
        let mut s = Snapshot::new();
        s.insert_bytes("a.go", b"package a\r\n\r\nfunc A() {}\r\n");
        assert_eq!(
            s.get(Utf8Path::new("a.go")),
            Some("package a\n\nfunc A() {}\n")
        );
    }

    #[test]
    fn lone_cr_is_preserved() {
        let mut s = Snapshot::new();
        s.insert_bytes("a.txt", b"x\ry");
        assert_eq!(s.get(Utf8Path::new("a.txt")), Some("x\ry"));
    }

    #[test]
    fn digest_ignores_insertion_order_and_line_endings() {
        let mut a = Snapshot::new();
        a.insert_bytes("b.go", b"b\n");
        a.insert_bytes("a.go", b"a\r\n");

        let mut b = Snapshot::new();
        b.insert_bytes("a.go", b"a\n");
        b.insert_bytes("b.go", b"b\n");

        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn digest_separates_path_and_content() {
        let mut a = Snapshot::new();
        a.insert_bytes("ab", b"c");
        let mut b = Snapshot::new();
        b.insert_bytes("a", b"bc");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn paths_are_sorted() {
        let mut s = Snapshot::new();
        s.insert_bytes("z/a.go", b"");
        s.insert_bytes("a/z.go", b"");
        s.insert_bytes("m.go", b"");
        let paths: Vec<&str> = s.paths().map(Utf8Path::as_str).collect();
        assert_eq!(paths, vec!["a/z.go", "m.go", "z/a.go"]);
        assert_eq!(s.len(), 3);
    }
}
