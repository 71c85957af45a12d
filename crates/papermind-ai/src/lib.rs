//! PaperMind AI — question answering over a collection of PDFs.
//!
//! Documents are split into overlapping text windows, ranked lexically
//! against the question, condensed by a summary model and finally answered
//! by a chat model with citations.

pub mod chunker;
pub mod docs;
pub mod error;
pub mod llm;
pub mod pdf;
pub mod retrieval;

pub use docs::{AddOutcome, Answer, Context, DocFilter, DocTags, Docs, NO_ANSWER};
pub use error::{AiError, Result};
pub use llm::{ChatModel, OpenAiChat};
