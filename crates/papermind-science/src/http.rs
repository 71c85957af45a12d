use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{Result, ScienceError};

// ─── RateLimitedClient ────────────────────────────────────────────────────────

pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

/// A response that was not checked for success, for callers that branch on
/// status and content type themselves.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_pdf(&self) -> bool {
        self.status.is_success()
            && self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.contains("application/pdf"))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl RateLimitedClient {
    pub fn new(min_interval: Duration, max_retries: u32, user_agent: &str) -> Result<Self> {
        Self::builder(min_interval, max_retries, user_agent, None)
    }

    /// Like [`RateLimitedClient::new`] with a socket timeout applied to every request.
    pub fn with_timeout(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Self::builder(min_interval, max_retries, user_agent, Some(timeout))
    }

    fn builder(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        // Each action runs on its own short-lived runtime, so idle pooled
        // connections must not outlive the request that opened them.
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .pool_max_idle_per_host(0);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Send the request built by `build`, retrying on 429 and, for idempotent
    /// requests, on transport errors. A transport error after a POST may follow
    /// a write the server already made, so it is returned as is.
    /// Non-success statuses other than 429 become `ApiError`.
    async fn send_checked<F>(
        &self,
        url: &str,
        idempotent: bool,
        build: F,
    ) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(url, attempt, "http request");
            match build(&self.client).send().await {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    if attempt >= self.max_retries {
                        return Err(ScienceError::RateLimit(url.to_string(), wait));
                    }
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ScienceError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return Ok(r),
                Err(e) => {
                    if !idempotent || attempt >= self.max_retries {
                        return Err(ScienceError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let resp = self
            .send_checked(url, true, |c| c.get(url).headers(headers.clone()))
            .await?;
        resp.text().await.map_err(ScienceError::Http)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    pub async fn get_json_with_query<T, Q>(
        &self,
        url: &str,
        query: &Q,
        headers: HeaderMap,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let resp = self
            .send_checked(url, true, |c| c.get(url).headers(headers.clone()).query(query))
            .await?;
        let text = resp.text().await.map_err(ScienceError::Http)?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    pub async fn post_json_with_headers<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<R> {
        let resp = self
            .send_checked(url, false, |c| c.post(url).headers(headers.clone()).json(body))
            .await?;
        let text = resp.text().await.map_err(ScienceError::Http)?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    /// Single GET with no retries and no status check.
    pub async fn get_raw(&self, url: &str) -> Result<RawResponse> {
        self.wait_for_rate_limit().await;
        debug!(url, "raw http request");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

// ─── DiskCache ────────────────────────────────────────────────────────────────

pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

fn cache_key_to_path(dir: &Path, key: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    dir.join(format!("{hash:016x}.json"))
}

#[derive(Serialize, serde::Deserialize)]
struct CacheEntry<T> {
    stored_at: i64, // Unix timestamp secs
    value: T,
}

impl DiskCache {
    pub fn new(root: &Path, namespace: &str, ttl: Duration) -> Self {
        let dir = root.join(namespace);
        let _ = std::fs::create_dir_all(&dir);
        Self { dir, ttl }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = cache_key_to_path(&self.dir, key);
        let data = tokio::fs::read(&path).await.ok()?;
        let entry: CacheEntry<T> = serde_json::from_slice(&data).ok()?;
        let age = Utc::now().timestamp().saturating_sub(entry.stored_at);
        if age.max(0) as u64 > self.ttl.as_secs() {
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(entry.value)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let path = cache_key_to_path(&self.dir, key);
        let entry = CacheEntry {
            stored_at: Utc::now().timestamp(),
            value,
        };
        if let Ok(data) = serde_json::to_vec(&entry) {
            let _ = tokio::fs::write(&path, data).await;
        }
    }
}
