use once_cell::sync::Lazy;
use regex::Regex;

static FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Longest file name `clean_filename` will produce, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;
const TRUNCATED_STEM_CHARS: usize = 95;

/// Make a file name safe for common filesystems.
///
/// Every character in `<>:"/\|?*` becomes `_`. Names longer than
/// [`MAX_FILENAME_CHARS`] are cut to their first 95 characters and given a
/// `.pdf` extension.
pub fn clean_filename(filename: &str) -> String {
    let cleaned = FORBIDDEN_CHARS.replace_all(filename, "_");
    if cleaned.chars().count() > MAX_FILENAME_CHARS {
        let mut truncated: String = cleaned.chars().take(TRUNCATED_STEM_CHARS).collect();
        truncated.push_str(".pdf");
        truncated
    } else {
        cleaned.into_owned()
    }
}

/// Lowercased, alphanumeric-only form used when comparing titles and file names.
pub fn normalize_for_compare(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_forbidden_char() {
        assert_eq!(clean_filename(r#"a<b>c:d"e/f\g|h?i*j.pdf"#), "a_b_c_d_e_f_g_h_i_j.pdf");
    }

    #[test]
    fn keeps_safe_names_untouched() {
        assert_eq!(clean_filename("Deep Learning (2015).pdf"), "Deep Learning (2015).pdf");
    }

    #[test]
    fn doi_slash_becomes_underscore() {
        assert_eq!(
            clean_filename("Nature paper_10.1038/nature14539.pdf"),
            "Nature paper_10.1038_nature14539.pdf"
        );
    }

    #[test]
    fn exactly_one_hundred_chars_is_kept() {
        let name = format!("{}.pdf", "a".repeat(96));
        assert_eq!(name.chars().count(), 100);
        assert_eq!(clean_filename(&name), name);
    }

    #[test]
    fn long_names_are_truncated_with_pdf_extension() {
        let name = format!("{}.pdf", "b".repeat(200));
        let cleaned = clean_filename(&name);
        assert_eq!(cleaned.chars().count(), 99);
        assert!(cleaned.ends_with(".pdf"));
        assert!(cleaned.starts_with(&"b".repeat(95)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = format!("{}.pdf", "é".repeat(120));
        let cleaned = clean_filename(&name);
        assert_eq!(cleaned.chars().count(), 99);
        assert!(cleaned.starts_with(&"é".repeat(95)));
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_for_compare("Attention_Is-All  You.Need"), "attention is all you need");
    }
}
