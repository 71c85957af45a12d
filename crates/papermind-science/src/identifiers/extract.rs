use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifiers::doi::Doi;

static DOI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+[A-Z0-9/]").expect("valid regex")
});

/// All DOIs mentioned in free text, in order of appearance, without duplicates.
pub fn extract_dois_from_text(text: &str) -> Vec<Doi> {
    let mut dois: Vec<Doi> = Vec::new();
    for m in DOI_REGEX.find_iter(text) {
        if let Ok(doi) = Doi::parse(m.as_str())
            && !dois.iter().any(|d| d.normalized == doi.normalized)
        {
            dois.push(doi);
        }
    }
    dois
}
