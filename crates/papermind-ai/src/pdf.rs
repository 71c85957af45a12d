use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{AiError, Result};

/// Text of every page of the PDF at `path`, whitespace collapsed.
///
/// Parsing is CPU-bound, so it runs on the blocking pool.
pub async fn extract_pdf_text(path: &Path) -> Result<String> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&owned))
        .await
        .map_err(|e| AiError::PdfExtraction(path.display().to_string(), e.to_string()))?
}

pub fn extract_pdf_text_blocking(path: &Path) -> Result<String> {
    let shown = path.display().to_string();
    let document = Document::load(path)
        .map_err(|err| AiError::PdfExtraction(shown.clone(), format!("open failed: {err}")))?;

    let page_numbers = document.get_pages().keys().copied().collect::<Vec<u32>>();
    if page_numbers.is_empty() {
        return Err(AiError::EmptyDocument(shown));
    }

    let mut text = String::new();
    for page in &page_numbers {
        match document.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(err) => warn!(path = %shown, page, error = %err, "skipping unreadable page"),
        }
    }

    let cleaned = normalize_whitespace(&text);
    if cleaned.is_empty() {
        return Err(AiError::EmptyDocument(shown));
    }

    debug!(
        path = %shown,
        pages = page_numbers.len(),
        chars = cleaned.chars().count(),
        "pdf text extracted"
    );
    Ok(cleaned)
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// PDF fixtures for tests in this and dependent crates.
#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use std::path::Path;

    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Write a one-page PDF per entry of `pages` at `path`.
    pub fn write_test_pdf(path: &Path, pages: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let encoded = content.encode().expect("encode page content");
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("write test pdf");
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_test_pdf;
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn extracts_all_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("two_pages.pdf");
        write_test_pdf(&path, &["Hello World", "Second page"]);

        let text = extract_pdf_text(&path).await.unwrap();
        assert!(text.contains("Hello World"));
        assert!(text.contains("Second page"));
        assert!(!text.contains('\n'));
    }

    #[tokio::test]
    async fn garbage_file_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = extract_pdf_text(&path).await.unwrap_err();
        assert!(matches!(err, AiError::PdfExtraction(_, _)));
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  a \n\n b\t c "), "a b c");
    }
}
