//! Zotero web API v3 client: key lookup, collections, item creation and listing.

use std::collections::HashMap;
use std::time::Duration;

use papermind_core::ItemMetadata;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;
use crate::sources::{ExternalSource, WorkMetadata};

pub const API_VERSION: &str = "3";

pub struct ZoteroSource {
    client: RateLimitedClient,
    base_url: String,
    api_key: String,
    item_type: String,
    page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct KeyInfo {
    #[serde(rename = "userID")]
    user_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoteroCollection {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope {
    data: ZoteroCollection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoteroItem {
    pub key: String,
    pub data: ZoteroItemData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoteroItemData {
    #[serde(rename = "itemType")]
    pub item_type: String,
    pub title: String,
    pub creators: Vec<Creator>,
    pub date: String,
    #[serde(rename = "DOI")]
    pub doi: String,
    pub tags: Vec<Tag>,
    pub collections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(rename = "creatorType")]
    pub creator_type: String,
    #[serde(rename = "firstName", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    pub tag: String,
}

/// Body of an item creation request.
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    #[serde(rename = "itemType")]
    pub item_type: String,
    pub title: String,
    pub creators: Vec<Creator>,
    pub date: String,
    #[serde(rename = "DOI", skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub url: String,
    #[serde(rename = "abstractNote")]
    pub abstract_note: String,
    pub collections: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extra: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    successful: HashMap<String, SuccessfulWrite>,
    #[serde(default)]
    failed: HashMap<String, FailedWrite>,
}

#[derive(Debug, Deserialize)]
struct SuccessfulWrite {
    key: String,
}

#[derive(Debug, Deserialize)]
struct FailedWrite {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl Creator {
    pub fn author_from_display_name(display: &str) -> Self {
        match display.trim().rsplit_once(' ') {
            Some((first, last)) => Self {
                creator_type: "author".to_string(),
                first_name: Some(first.trim().to_string()),
                last_name: Some(last.trim().to_string()),
                name: None,
            },
            None => Self {
                creator_type: "author".to_string(),
                first_name: None,
                last_name: None,
                name: Some(display.trim().to_string()),
            },
        }
    }

    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl NewItem {
    pub fn from_metadata(meta: &WorkMetadata, collection_key: Option<&str>) -> Self {
        let (doi, extra) = if meta.work_type.zotero_has_doi_field() {
            (Some(meta.doi.clone()), String::new())
        } else {
            (None, format!("DOI: {}", meta.doi))
        };
        Self {
            item_type: meta.work_type.to_zotero_item_type().to_string(),
            title: meta.title.clone(),
            creators: meta
                .authors
                .iter()
                .map(|a| Creator::author_from_display_name(a))
                .collect(),
            date: meta.year.clone(),
            doi,
            url: meta.url.clone(),
            abstract_note: meta.abstract_text.clone(),
            collections: collection_key.map(|k| vec![k.to_string()]).unwrap_or_default(),
            extra,
        }
    }
}

impl ZoteroItem {
    pub fn title(&self) -> &str {
        if self.data.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.data.title
        }
    }

    pub fn to_item_metadata(&self) -> ItemMetadata {
        ItemMetadata {
            title: self.title().to_string(),
            authors: self
                .data
                .creators
                .iter()
                .map(Creator::display_name)
                .filter(|n| !n.is_empty())
                .collect(),
            year: self.data.date.clone(),
            doi: self.data.doi.clone(),
            tags: self.data.tags.iter().map(|t| t.tag.clone()).collect(),
            collections: self.data.collections.clone(),
        }
    }
}

impl ZoteroSource {
    pub fn new(base_url: &str, api_key: &str, item_type: &str, page_size: u32) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::new(Duration::from_millis(100), 3, "papermind/0.1")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            item_type: item_type.to_string(),
            page_size,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("Zotero-API-Version", HeaderValue::from_static(API_VERSION));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| ScienceError::NotAuthenticated("Zotero (malformed API key)".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// The numeric user the API key belongs to.
    pub async fn detect_user_id(&self) -> Result<u64> {
        let url = format!("{}/keys/{}", self.base_url, urlencoding::encode(&self.api_key));
        let body = self.client.get_with_headers(&url, self.headers()?).await?;
        let info: KeyInfo =
            serde_json::from_str(&body).map_err(|e| ScienceError::Parse(e.to_string()))?;
        debug!(user_id = info.user_id, "zotero key resolved");
        Ok(info.user_id)
    }

    pub async fn list_collections(&self, user_id: u64) -> Result<Vec<ZoteroCollection>> {
        let url = format!("{}/users/{user_id}/collections", self.base_url);
        let envelopes: Vec<CollectionEnvelope> = self
            .client
            .get_json_with_query(&url, &[("limit", self.page_size)], self.headers()?)
            .await?;
        Ok(envelopes.into_iter().map(|e| e.data).collect())
    }

    /// Create one item and return its key.
    pub async fn create_item(&self, user_id: u64, item: &NewItem) -> Result<String> {
        let url = format!("{}/users/{user_id}/items", self.base_url);
        let resp: WriteResponse = self
            .client
            .post_json_with_headers(&url, &[item], self.headers()?)
            .await?;

        if let Some(created) = resp.successful.get("0") {
            return Ok(created.key.clone());
        }
        let reason = resp
            .failed
            .get("0")
            .map(|f| format!("{} - {}", f.code, f.message))
            .unwrap_or_else(|| "item was not created".to_string());
        Err(ScienceError::ApiError(self.name().to_string(), reason))
    }

    /// Items of the configured type, optionally scoped to one collection.
    pub async fn list_items(
        &self,
        user_id: u64,
        collection_key: Option<&str>,
    ) -> Result<Vec<ZoteroItem>> {
        let url = match collection_key {
            Some(key) => format!("{}/users/{user_id}/collections/{key}/items", self.base_url),
            None => format!("{}/users/{user_id}/items", self.base_url),
        };
        let limit = self.page_size.to_string();
        let query = [("itemType", self.item_type.as_str()), ("limit", limit.as_str())];
        self.client
            .get_json_with_query(&url, &query, self.headers()?)
            .await
    }
}

impl ExternalSource for ZoteroSource {
    fn name(&self) -> &'static str {
        "Zotero"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
