use crate::error::{Result, ScienceError};
use serde::{Deserialize, Serialize};

const KNOWN_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
    "DOI:",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

/// Trim the input and strip a resolver URL or `doi:` prefix, without
/// validating what remains.
pub fn normalize_identifier(input: &str) -> String {
    let input = input.trim();
    KNOWN_PREFIXES
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .map(str::trim_start)
        .unwrap_or(input)
        .to_string()
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = normalize_identifier(input);

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ScienceError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi() {
        let doi = Doi::parse("10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
        assert_eq!(doi.url, "https://doi.org/10.1000/xyz123");
    }

    #[test]
    fn doi_with_https_prefix() {
        let doi = Doi::parse("https://doi.org/10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn doi_with_doi_colon_prefix() {
        let doi = Doi::parse("doi:10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn doi_with_space_after_colon() {
        let doi = Doi::parse("  DOI: 10.1000/xyz123 ").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
        assert_eq!(doi.raw, "DOI: 10.1000/xyz123");
    }

    #[test]
    fn doi_uppercase_normalized_to_lowercase() {
        let doi = Doi::parse("10.1038/NATURE12373").unwrap();
        assert_eq!(doi.normalized, "10.1038/nature12373");
        assert_eq!(doi.to_string(), "10.1038/nature12373");
    }

    #[test]
    fn doi_with_dx_doi_org() {
        let doi = Doi::parse("http://dx.doi.org/10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn reject_not_a_doi() {
        assert!(matches!(Doi::parse("PMC4234567"), Err(ScienceError::InvalidDoi(_))));
    }

    #[test]
    fn reject_doi_without_suffix() {
        assert!(Doi::parse("10.1000/").is_err());
        assert!(Doi::parse("10.1000").is_err());
    }

    #[test]
    fn reject_empty_string() {
        assert!(Doi::parse("").is_err());
    }

    #[test]
    fn normalize_strips_prefixes_only() {
        assert_eq!(normalize_identifier(" https://doi.org/10.1/ABC "), "10.1/ABC");
        assert_eq!(normalize_identifier("doi: 10.1/x"), "10.1/x");
        assert_eq!(normalize_identifier("PMC4234567"), "PMC4234567");
    }
}
