use crate::FIXED_EXCLUSIONS;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;

/// Paths that discovery, snapshots, analysis and fixes must not look at.
///
/// Two kinds of rule apply:
/// - `names`: a path is excluded if *any* of its components equals a name.
/// - `ignored`: a path is excluded if it equals, or lies under, an ignored path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusions {
    names: BTreeSet<String>,
    ignored: BTreeSet<Utf8PathBuf>,
}

impl Default for Exclusions {
    fn default() -> Self {
        Self::with_names(FIXED_EXCLUSIONS.iter().copied())
    }
}

impl Exclusions {
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ignored: BTreeSet::new(),
        }
    }

    /// Add paths reported as ignored by version control.
    ///
    /// Trailing `/` markers and a leading `./` are stripped.
    pub fn with_ignored<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in paths {
            let p = p.as_ref().trim();
            let p = p.strip_prefix("./").unwrap_or(p).trim_end_matches('/');
            if !p.is_empty() {
                self.ignored.insert(Utf8PathBuf::from(p));
            }
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn ignored(&self) -> impl Iterator<Item = &Utf8Path> {
        self.ignored.iter().map(Utf8PathBuf::as_path)
    }

    /// Whether a repository-relative path is excluded.
    pub fn is_excluded(&self, rel: &Utf8Path) -> bool {
        if rel
            .components()
            .any(|c| self.names.contains(c.as_str()))
        {
            return true;
        }
        self.ignored.iter().any(|ig| rel.starts_with(ig))
    }
}
