use serde::{Deserialize, Serialize};

use crate::types::DocumentType;

pub mod crossref;
pub mod mirror;
pub mod zotero;

/// Something the application talks to over HTTP.
pub trait ExternalSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn base_url(&self) -> &str;
}

/// Normalized bibliographic description of a work, as returned by the
/// metadata lookup service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkMetadata {
    pub title: String,
    /// "Given Family" display names.
    pub authors: Vec<String>,
    /// Publication year, empty when unknown.
    pub year: String,
    pub doi: String,
    pub url: String,
    pub abstract_text: String,
    pub work_type: DocumentType,
}
