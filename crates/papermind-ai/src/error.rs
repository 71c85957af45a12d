use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("PDF extraction failed for {0}: {1}")]
    PdfExtraction(String, String),

    #[error("no text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("no documents loaded")]
    NoDocuments,
}

pub type Result<T> = std::result::Result<T, AiError>;
