pub mod config;
pub mod error;
pub mod filename;
pub mod library;
pub mod matching;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use error::{PapermindError, Result};
pub use filename::clean_filename;
pub use library::{LibraryInventory, scan_pdfs};
pub use matching::match_item_to_pdf;
pub use models::{DocumentOrigin, ItemMetadata, PaperFile};
pub use store::MetadataStore;
