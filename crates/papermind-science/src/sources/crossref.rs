use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::http::{DiskCache, RateLimitedClient};
use crate::identifiers::doi::Doi;
use crate::sources::{ExternalSource, WorkMetadata};
use crate::types::DocumentType;

pub struct CrossRefSource {
    client: RateLimitedClient,
    cache: DiskCache,
    base_url: String,
}

impl CrossRefSource {
    pub fn new(base_url: &str, polite_email: Option<&str>, cache_root: &Path) -> Result<Self> {
        Self::with_params(base_url, Duration::from_millis(100), polite_email, cache_root)
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        polite_email: Option<&str>,
        cache_root: &Path,
    ) -> Result<Self> {
        let user_agent = match polite_email {
            Some(email) => format!("papermind/0.1 (mailto:{email})"),
            None => "papermind/0.1".to_string(),
        };

        Ok(Self {
            client: RateLimitedClient::new(min_interval, 3, &user_agent)?,
            cache: DiskCache::new(cache_root, "crossref", Duration::from_secs(7 * 24 * 3600)),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_by_doi(&self, doi: &Doi) -> Result<CrossRefWork> {
        let key = format!("doi:{}", doi.normalized);
        if let Some(cached) = self.cache.get::<CrossRefWork>(&key).await {
            debug!(doi = %doi, "crossref cache hit");
            return Ok(cached);
        }

        let url = format!("{}/works/{}", self.base_url, doi.normalized);
        let val: Value = self.client.get_json(&url).await?;

        let work = CrossRefWork::from_json(&val["message"])?;
        self.cache.set(&key, &work).await;

        Ok(work)
    }

    /// Metadata for a DOI in the shape used to create bibliography items.
    pub async fn fetch_metadata(&self, doi: &Doi) -> Result<WorkMetadata> {
        Ok(self.fetch_by_doi(doi).await?.into_metadata())
    }
}

impl ExternalSource for CrossRefSource {
    fn name(&self) -> &'static str {
        "Crossref"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossRefWork {
    pub doi: String,
    pub title: Vec<String>,
    pub author: Vec<CrossRefAuthor>,
    pub published_year: Option<i32>,
    pub work_type: DocumentType,
    pub url: Option<String>,
    pub abstract_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossRefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    pub name: Option<String>,
}

impl CrossRefWork {
    pub fn from_json(v: &Value) -> Result<Self> {
        let doi = v["DOI"]
            .as_str()
            .ok_or_else(|| ScienceError::Parse("Missing DOI in CrossRef response".to_string()))?
            .to_string();

        let title = v["title"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str()).map(|s| s.to_string()).collect())
            .unwrap_or_default();

        let author = v["author"]
            .as_array()
            .map(|a| a.iter().map(CrossRefAuthor::from_json).collect())
            .unwrap_or_default();

        let work_type = v["type"]
            .as_str()
            .map(DocumentType::from_crossref_type)
            .unwrap_or_default();

        Ok(Self {
            doi,
            title,
            author,
            published_year: parse_year(v),
            work_type,
            url: v["URL"].as_str().map(|s| s.to_string()),
            abstract_text: v["abstract"].as_str().map(|s| s.to_string()),
        })
    }

    pub fn into_metadata(self) -> WorkMetadata {
        WorkMetadata {
            title: self.title.first().cloned().unwrap_or_default(),
            authors: self
                .author
                .iter()
                .filter_map(CrossRefAuthor::display_name)
                .collect(),
            year: self.published_year.map(|y| y.to_string()).unwrap_or_default(),
            doi: self.doi,
            url: self.url.unwrap_or_default(),
            abstract_text: self.abstract_text.unwrap_or_default(),
            work_type: self.work_type,
        }
    }
}

impl CrossRefAuthor {
    fn from_json(v: &Value) -> Self {
        Self {
            given: v["given"].as_str().map(|s| s.to_string()),
            family: v["family"].as_str().map(|s| s.to_string()),
            name: v["name"].as_str().map(|s| s.to_string()),
        }
    }

    /// "Given Family", or whichever part exists; organisations use `name`.
    pub fn display_name(&self) -> Option<String> {
        match (&self.given, &self.family) {
            (Some(g), Some(f)) => Some(format!("{g} {f}")),
            (None, Some(f)) => Some(f.clone()),
            (Some(g), None) => Some(g.clone()),
            (None, None) => self.name.clone().filter(|n| !n.trim().is_empty()),
        }
    }
}

fn parse_year(v: &Value) -> Option<i32> {
    // CrossRef date parts: "published-print": {"date-parts": [[2017, 6, 12]]}
    v["published-print"]["date-parts"][0][0]
        .as_i64()
        .or_else(|| v["published-online"]["date-parts"][0][0].as_i64())
        .or_else(|| v["issued"]["date-parts"][0][0].as_i64())
        .or_else(|| v["created"]["date-parts"][0][0].as_i64())
        .map(|n| n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    const WORK_BODY: &str = r#"{
        "status": "ok",
        "message": {
            "DOI": "10.1038/nature14539",
            "title": ["Human-level control through deep reinforcement learning"],
            "author": [
                {"given": "Volodymyr", "family": "Mnih"},
                {"given": "Koray", "family": "Kavukcuoglu"},
                {"name": "DeepMind Team"},
                {}
            ],
            "published-print": {"date-parts": [[2015, 2, 26]]},
            "type": "journal-article",
            "URL": "http://dx.doi.org/10.1038/nature14539",
            "abstract": "<jats:p>An agent...</jats:p>"
        }
    }"#;

    #[tokio::test]
    async fn test_crossref_fetch_by_doi() {
        let mut server = Server::new_async().await;
        let cache = TempDir::new().unwrap();

        let _m = server
            .mock("GET", "/works/10.1038/nature14539")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK_BODY)
            .create_async()
            .await;

        let source =
            CrossRefSource::with_params(&server.url(), Duration::ZERO, None, cache.path()).unwrap();
        let doi = Doi::parse("10.1038/nature14539").unwrap();
        let meta = source.fetch_metadata(&doi).await.unwrap();

        assert_eq!(meta.title, "Human-level control through deep reinforcement learning");
        assert_eq!(meta.authors, vec!["Volodymyr Mnih", "Koray Kavukcuoglu", "DeepMind Team"]);
        assert_eq!(meta.year, "2015");
        assert_eq!(meta.url, "http://dx.doi.org/10.1038/nature14539");
        assert_eq!(meta.work_type, DocumentType::JournalArticle);
    }

    #[tokio::test]
    async fn test_crossref_second_lookup_hits_cache() {
        let mut server = Server::new_async().await;
        let cache = TempDir::new().unwrap();

        let m = server
            .mock("GET", "/works/10.1038/nature14539")
            .with_status(200)
            .with_body(WORK_BODY)
            .expect(1)
            .create_async()
            .await;

        let source =
            CrossRefSource::with_params(&server.url(), Duration::ZERO, None, cache.path()).unwrap();
        let doi = Doi::parse("10.1038/nature14539").unwrap();
        source.fetch_by_doi(&doi).await.unwrap();
        source.fetch_by_doi(&doi).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_crossref_unknown_doi_is_error() {
        let mut server = Server::new_async().await;
        let cache = TempDir::new().unwrap();

        let _m = server
            .mock("GET", "/works/10.9999/missing")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let source =
            CrossRefSource::with_params(&server.url(), Duration::ZERO, None, cache.path()).unwrap();
        let doi = Doi::parse("10.9999/missing").unwrap();
        assert!(source.fetch_by_doi(&doi).await.is_err());
    }

    #[test]
    fn test_year_falls_back_to_issued() {
        let v: Value = serde_json::json!({
            "DOI": "10.1/x",
            "issued": {"date-parts": [[2019]]}
        });
        let meta = CrossRefWork::from_json(&v).unwrap().into_metadata();
        assert_eq!(meta.year, "2019");
        assert_eq!(meta.title, "");
    }

    #[test]
    fn test_missing_doi_is_parse_error() {
        let v: Value = serde_json::json!({"title": ["x"]});
        assert!(matches!(CrossRefWork::from_json(&v), Err(ScienceError::Parse(_))));
    }
}
