use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which of the two PDF directories a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOrigin {
    Zotero,
    Local,
}

impl fmt::Display for DocumentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zotero => write!(f, "zotero"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// A PDF found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFile {
    pub path: PathBuf,
    pub origin: DocumentOrigin,
}

impl PaperFile {
    pub fn new(path: impl Into<PathBuf>, origin: DocumentOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Bibliographic record attached to a PDF after synchronization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Zotero collection keys.
    #[serde(default)]
    pub collections: Vec<String>,
}

impl ItemMetadata {
    /// `"A, B, C (2020). Title"`: first three authors, `n.d.` for a missing year.
    pub fn citation(&self) -> String {
        let authors = self
            .authors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{authors} ({}). {}", self.year_or_nd(), self.title)
    }

    /// First two authors, with `et al.` appended when there are more.
    pub fn authors_short(&self) -> String {
        let mut out = self
            .authors
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > 2 {
            out.push_str(" et al.");
        }
        out
    }

    pub fn year_or_nd(&self) -> &str {
        if self.year.trim().is_empty() {
            "n.d."
        } else {
            &self.year
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn in_collection(&self, key: &str) -> bool {
        self.collections.iter().any(|c| c == key)
    }
}
