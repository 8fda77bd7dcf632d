use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of code rooted at a directory containing the module sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Module {
    /// Repository-relative directory; `.` for the repository root.
    pub dir: Utf8PathBuf,
}

impl Module {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        let dir = dir.into();
        if dir.as_str().is_empty() {
            Self {
                dir: Utf8PathBuf::from("."),
            }
        } else {
            Self { dir }
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Resolve a module-relative path to a repository-relative one.
    pub fn join(&self, rel: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        if self.is_root() {
            rel.as_ref().to_path_buf()
        } else {
            self.dir.join(rel)
        }
    }

    pub fn is_root(&self) -> bool {
        self.dir.as_str() == "."
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dir_is_root() {
        let m = Module::new("");
        assert!(m.is_root());
        assert_eq!(m.to_string(), ".");
        assert_eq!(m.join("a.go"), Utf8PathBuf::from("a.go"));
    }

    #[test]
    fn nested_join() {
        let m = Module::new("tools/gen");
        assert!(!m.is_root());
        assert_eq!(m.join("main.go"), Utf8PathBuf::from("tools/gen/main.go"));
    }
}
