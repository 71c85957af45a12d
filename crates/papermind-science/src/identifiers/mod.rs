pub mod doi;
pub mod extract;

pub use doi::{Doi, normalize_identifier};
pub use extract::extract_dois_from_text;
