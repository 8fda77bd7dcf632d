use crate::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    pub name: String,
    /// Whether the pass emits suggested fixes worth applying automatically.
    #[serde(default)]
    pub fixable: bool,
}

impl Analyzer {
    pub fn new(name: impl Into<String>, fixable: bool) -> Self {
        Self {
            name: name.into(),
            fixable,
        }
    }
}

/// `go vet` passes, in the order `go tool vet help` lists them.
const GO_VET: &[(&str, bool)] = &[
    ("appends", false),
    ("asmdecl", false),
    ("assign", true),
    ("atomic", false),
    ("bools", false),
    ("buildtag", false),
    ("cgocall", false),
    ("composites", true),
    ("copylocks", false),
    ("defers", false),
    ("directive", false),
    ("errorsas", false),
    ("framepointer", false),
    ("httpresponse", false),
    ("ifaceassert", false),
    ("loopclosure", false),
    ("lostcancel", false),
    ("nilfunc", false),
    ("printf", false),
    ("shift", false),
    ("sigchanyzer", true),
    ("slog", false),
    ("stdmethods", false),
    ("stdversion", false),
    ("stringintconv", true),
    ("structtag", false),
    ("testinggoroutine", false),
    ("tests", false),
    ("timeformat", true),
    ("unmarshal", false),
    ("unreachable", false),
    ("unsafeptr", false),
    ("unusedresult", false),
];

/// The set of analyzers a run may use. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    analyzers: Vec<Analyzer>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::go_vet()
    }
}

impl Registry {
    pub fn go_vet() -> Self {
        Self {
            analyzers: GO_VET
                .iter()
                .map(|(name, fixable)| Analyzer::new(*name, *fixable))
                .collect(),
        }
    }

    pub fn new(analyzers: Vec<Analyzer>) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for a in &analyzers {
            if !seen.insert(a.name.as_str()) {
                return Err(RegistryError::Duplicate(a.name.clone()));
            }
        }
        Ok(Self { analyzers })
    }

    /// Keep only the named analyzers, in registry order.
    ///
    /// An empty selection keeps everything.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, RegistryError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let wanted: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
        if let Some(unknown) = wanted.iter().find(|n| self.get(n).is_none()) {
            return Err(RegistryError::Unknown((*unknown).to_string()));
        }
        Ok(Self {
            analyzers: self
                .analyzers
                .iter()
                .filter(|a| wanted.contains(a.name.as_str()))
                .cloned()
                .collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Analyzer> {
        self.analyzers.iter().find(|a| a.name == name)
    }

    pub fn all(&self) -> &[Analyzer] {
        &self.analyzers
    }

    /// The subset whose suggested fixes are applied in fix mode.
    pub fn fixable(&self) -> Vec<Analyzer> {
        self.analyzers.iter().filter(|a| a.fixable).cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.analyzers.iter().map(|a| a.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn go_vet_names_are_unique() {
        let reg = Registry::go_vet();
        assert_eq!(Registry::new(reg.all().to_vec()).as_ref(), Ok(&reg));
    }

    #[test]
    fn fixable_is_a_subset() {
        let reg = Registry::go_vet();
        let fixable: Vec<String> = reg.fixable().into_iter().map(|a| a.name).collect();
        assert_eq!(
            fixable,
            vec!["assign", "composites", "sigchanyzer", "stringintconv", "timeformat"]
        );
        assert!(fixable.iter().all(|n| reg.get(n).is_some()));
    }

    #[test]
    fn duplicate_is_rejected() {
        let err = Registry::new(vec![Analyzer::new("printf", false), Analyzer::new("printf", true)])
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("printf".to_string()));
    }

    #[test]
    fn select_keeps_registry_order() {
        let reg = Registry::go_vet().select(&["printf", "assign"]).unwrap();
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["assign", "printf"]);
        assert_eq!(
            Registry::go_vet().select(&["nope"]).unwrap_err(),
            RegistryError::Unknown("nope".to_string())
        );
        assert_eq!(Registry::go_vet().select::<&str>(&[]).unwrap(), Registry::go_vet());
    }
}
