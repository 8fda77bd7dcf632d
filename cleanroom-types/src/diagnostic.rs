use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved source position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Repository-relative file path.
    pub file: Utf8PathBuf,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<Utf8PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A byte-range replacement within one file.
///
/// `start..end` is half-open and refers to the file content *before* any edit
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextEdit {
    pub file: Utf8PathBuf,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub new_text: Vec<u8>,
}

impl TextEdit {
    pub fn new(file: impl Into<Utf8PathBuf>, start: usize, end: usize, new_text: &[u8]) -> Self {
        Self {
            file: file.into(),
            start,
            end,
            new_text: new_text.to_vec(),
        }
    }

    /// True when the edit only inserts text.
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// An ordered list of edits believed to resolve a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub message: String,
    #[serde(default)]
    pub edits: Vec<TextEdit>,
}

/// A static-analysis finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub location: Location,
    pub message: String,
    /// Name of the analyzer that produced the finding.
    pub analyzer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<SuggestedFix>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.location, self.message, self.analyzer)
    }
}
