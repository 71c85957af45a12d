//! Best-effort pairing of bibliography records with PDFs on disk.
//!
//! A file whose name contains the record's DOI wins outright. Failing that,
//! any of the first three title words longer than three characters appearing
//! in the file name makes the file a candidate; among several candidates the
//! one whose stem is most similar to the title is picked. This can mismatch.

use std::path::{Path, PathBuf};

use crate::filename::normalize_for_compare;
use crate::models::file_stem;

const TITLE_KEYWORDS: usize = 3;
const MIN_KEYWORD_CHARS: usize = 4;

/// Find the PDF in `pdfs` that most plausibly belongs to the record.
pub fn match_item_to_pdf<'a>(title: &str, doi: &str, pdfs: &'a [PathBuf]) -> Option<&'a Path> {
    let doi = doi.trim().to_lowercase();
    if !doi.is_empty() {
        // Downloads replace `/` with `_`, so look for both spellings.
        let doi_file_form = doi.replace('/', "_");
        let by_doi = pdfs.iter().find(|pdf| {
            let name = lower_file_name(pdf);
            name.contains(&doi) || name.contains(&doi_file_form)
        });
        if let Some(pdf) = by_doi {
            return Some(pdf.as_path());
        }
    }

    let keywords = title_keywords(title);
    if keywords.is_empty() {
        return None;
    }

    let candidates: Vec<&PathBuf> = pdfs
        .iter()
        .filter(|pdf| {
            let name = lower_file_name(pdf);
            keywords.iter().any(|word| name.contains(word.as_str()))
        })
        .collect();

    match candidates.as_slice() {
        [] => None,
        [only] => Some(only.as_path()),
        _ => {
            let wanted = normalize_for_compare(title);
            let mut best: Option<(&PathBuf, f64)> = None;
            for pdf in candidates {
                let score = strsim::jaro_winkler(&wanted, &normalize_for_compare(&file_stem(pdf)));
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((pdf, score));
                }
            }
            best.map(|(pdf, _)| pdf.as_path())
        }
    }
}

/// The first three title words, lowercased, keeping only those longer than three chars.
pub fn title_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .take(TITLE_KEYWORDS)
        .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
        .map(str::to_string)
        .collect()
}

fn lower_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
