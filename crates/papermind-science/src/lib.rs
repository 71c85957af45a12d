//! PaperMind Science — Zotero, Crossref and PDF mirror clients.

pub mod error;
pub mod http;
pub mod identifiers;
pub mod types;
pub mod sources;

pub use error::{Result, ScienceError};
pub use identifiers::doi::Doi;
pub use sources::WorkMetadata;
pub use types::DocumentType;
