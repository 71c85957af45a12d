use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DocumentType {
    Book,
    BookChapter,
    JournalArticle,
    ConferencePaper,
    Preprint,
    TechnicalReport,
    Thesis,
    Dataset,
    Other(String),
}

impl DocumentType {
    pub fn from_crossref_type(s: &str) -> Self {
        match s {
            "journal-article" => Self::JournalArticle,
            "book" | "monograph" | "edited-book" => Self::Book,
            "book-chapter" => Self::BookChapter,
            "proceedings-article" => Self::ConferencePaper,
            "posted-content" => Self::Preprint,
            "report" => Self::TechnicalReport,
            "dissertation" => Self::Thesis,
            "dataset" => Self::Dataset,
            other => Self::Other(other.to_string()),
        }
    }

    /// Zotero `itemType` for a new item of this kind.
    pub fn to_zotero_item_type(&self) -> &'static str {
        match self {
            Self::JournalArticle | Self::Other(_) => "journalArticle",
            Self::Book => "book",
            Self::BookChapter => "bookSection",
            Self::ConferencePaper => "conferencePaper",
            Self::Preprint => "preprint",
            Self::TechnicalReport => "report",
            Self::Thesis => "thesis",
            Self::Dataset => "dataset",
        }
    }
}

impl DocumentType {
    /// Zotero only has a dedicated `DOI` field on some item types; the rest
    /// carry it in `extra`.
    pub fn zotero_has_doi_field(&self) -> bool {
        matches!(
            self,
            Self::JournalArticle
                | Self::Other(_)
                | Self::ConferencePaper
                | Self::Preprint
                | Self::Dataset
        )
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::JournalArticle
    }
}
