use std::path::{Path, PathBuf};
use std::time::Duration;

use papermind_core::clean_filename;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;
use crate::sources::ExternalSource;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What came of a download attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Unavailable,
}

/// A DOI-addressed PDF mirror: `{mirror}/{doi}` answers with either the PDF
/// itself or an HTML page embedding it.
pub struct MirrorSource {
    client: RateLimitedClient,
    mirror: String,
}

impl MirrorSource {
    pub fn new(mirror: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::with_timeout(
                Duration::from_millis(500),
                0,
                "papermind/0.1",
                timeout,
            )?,
            mirror: mirror.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the PDF for `doi` into `dir`, naming it after the title and DOI.
    pub async fn download_pdf(
        &self,
        doi: &str,
        title: Option<&str>,
        dir: &Path,
    ) -> Result<DownloadOutcome> {
        let url = format!("{}/{}", self.mirror, doi.trim_start_matches('/'));
        let landing = self.client.get_raw(&url).await?;

        let pdf = if landing.is_pdf() {
            landing.body
        } else if landing.status.is_success() {
            let Some(pdf_url) = parse_mirror_page(&landing.text(), &self.mirror)? else {
                debug!(doi, "mirror page has no embedded PDF");
                return Ok(DownloadOutcome::Unavailable);
            };
            let embedded = self.client.get_raw(&pdf_url).await?;
            if !embedded.is_pdf() {
                debug!(doi, url = %pdf_url, status = %embedded.status, "embedded link is not a PDF");
                return Ok(DownloadOutcome::Unavailable);
            }
            embedded.body
        } else {
            debug!(doi, status = %landing.status, "mirror answered without a document");
            return Ok(DownloadOutcome::Unavailable);
        };

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(pdf_file_name(title, doi));
        tokio::fs::write(&path, &pdf).await?;
        info!(path = %path.display(), bytes = pdf.len(), "PDF saved");
        Ok(DownloadOutcome::Saved(path))
    }
}

impl ExternalSource for MirrorSource {
    fn name(&self) -> &'static str {
        "PDF mirror"
    }

    fn base_url(&self) -> &str {
        &self.mirror
    }
}

/// `{title}_{doi}.pdf`, made safe for the filesystem.
pub fn pdf_file_name(title: Option<&str>, doi: &str) -> String {
    let title = title.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("document");
    clean_filename(&format!("{title}_{doi}.pdf"))
}

/// Link of the PDF embedded in a mirror landing page, made absolute.
pub fn parse_mirror_page(html: &str, mirror: &str) -> Result<Option<String>> {
    let iframe_selector = parse_selector("iframe#pdf, iframe[src*='.pdf']")?;
    let embed_selector = parse_selector("embed[type='application/pdf'], embed[src*='.pdf']")?;

    let document = Html::parse_document(html);

    Ok(document
        .select(&iframe_selector)
        .next()
        .and_then(|el| el.value().attr("src"))
        .or_else(|| {
            document
                .select(&embed_selector)
                .next()
                .and_then(|el| el.value().attr("src"))
        })
        .map(|src| normalize_mirror_url(src, mirror)))
}

fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input)
        .map_err(|e| ScienceError::Parse(format!("invalid selector {input}: {e}")))
}

fn normalize_mirror_url(src: &str, mirror: &str) -> String {
    if src.starts_with("//") {
        return format!("https:{src}");
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }
    if src.starts_with('/') {
        return format!("{}{}", mirror.trim_end_matches('/'), src);
    }
    format!("{}/{}", mirror.trim_end_matches('/'), src)
}
