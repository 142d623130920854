//! Rate-limited client for the DAWSON public API.
//!
//! [`ApiClient`] owns the request pacing, the call counter, endpoint paths and
//! JSON decoding. Raw HTTP is delegated to a [`Transport`], so the whole
//! extraction pipeline can run against an in-memory API in tests.
//!
//! # Outcome classification
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx with a decodable body | `Ok` |
//! | 404, 410 | [`ApiError::NotFound`] |
//! | 401, 403 (not public) | [`ApiError::NotFound`] |
//! | other status, network error, timeout | [`ApiError::Transient`] |
//! | 2xx with malformed JSON | [`ApiError::Transient`] |
//!
//! No request is retried; callers decide whether to skip the unit of work.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{CaseDetail, DownloadUrlResponse, SearchHit, SearchResponse};

/// Which timeout budget a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// JSON call against the API.
    Api,
    /// PDF content from a signed URL.
    Content,
}

/// Raw GET transport.
///
/// Implementations return the response body on success and classify
/// failures into [`ApiError`] variants.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        kind: RequestKind,
    ) -> Result<Vec<u8>, ApiError>;
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    download_timeout: Duration,
}

impl HttpTransport {
    pub fn new(api: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(api.user_agent.clone())
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            download_timeout: Duration::from_secs(api.download_timeout_secs),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        kind: RequestKind,
    ) -> Result<Vec<u8>, ApiError> {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if kind == RequestKind::Content {
            req = req.timeout(self.download_timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::transient(url, e))?;

        let status = resp.status();
        if let Some(err) = classify_status(url, status) {
            let body = resp.text().await.unwrap_or_default();
            debug!(
                url,
                status = status.as_u16(),
                body = %body.chars().take(300).collect::<String>(),
                "request failed"
            );
            return Err(err);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::transient(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Map a non-success HTTP status to an [`ApiError`]. Success yields `None`.
pub fn classify_status(url: &str, status: StatusCode) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }
    match status {
        StatusCode::NOT_FOUND
        | StatusCode::GONE
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN => Some(ApiError::NotFound {
            url: url.to_string(),
        }),
        other => Some(ApiError::transient(url, format!("HTTP {}", other))),
    }
}

/// Enforces a minimum spacing between consecutive requests.
///
/// Each call waits for whatever remains of `delay` since the previous call
/// started. There is no burst allowance.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Sequential, rate-limited DAWSON API client.
pub struct ApiClient<T> {
    transport: T,
    base_url: String,
    limiter: RateLimiter,
    api_calls: u64,
    date_range: String,
    search_limit: u32,
}

impl ApiClient<HttpTransport> {
    /// Build a client for the configured environment over real HTTP.
    pub fn from_config(api: &ApiConfig) -> anyhow::Result<Self> {
        Ok(Self::new(HttpTransport::new(api)?, api))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, api: &ApiConfig) -> Self {
        Self {
            transport,
            base_url: api.resolved_base_url(),
            limiter: RateLimiter::new(api.rate_limit_delay()),
            api_calls: 0,
            date_range: api.date_range.clone(),
            search_limit: api.search_limit,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of API calls issued so far, whatever their outcome.
    pub fn api_calls(&self) -> u64 {
        self.api_calls
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a paced GET against `path` and decode the JSON body.
    pub async fn request<D: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<D, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        self.api_calls += 1;
        self.limiter.acquire().await;
        debug!(url = %url, call = self.api_calls, "GET");

        let body = self.transport.get(&url, query, RequestKind::Api).await?;
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::transient(&url, format!("malformed JSON: {}", e)))
    }

    /// Keyword search for orders; returns the raw hits.
    pub async fn search(&mut self, keyword: &str) -> Result<Vec<SearchHit>, ApiError> {
        let query = vec![
            ("keyword".to_string(), keyword.to_string()),
            ("dateRange".to_string(), self.date_range.clone()),
            ("limit".to_string(), self.search_limit.to_string()),
        ];
        let resp: SearchResponse = self.request("/public-api/order-search", &query).await?;
        Ok(resp.into_hits())
    }

    pub async fn case_detail(&mut self, docket_number: &str) -> Result<CaseDetail, ApiError> {
        self.request(&format!("/public-api/cases/{}", docket_number), &[])
            .await
    }

    /// Short-lived signed URL for a document's PDF, if the API returned one.
    pub async fn download_url(
        &mut self,
        docket_number: &str,
        entry_id: &str,
    ) -> Result<Option<String>, ApiError> {
        let path = format!(
            "/public-api/{}/{}/public-document-download-url",
            docket_number, entry_id
        );
        let resp: DownloadUrlResponse = self.request(&path, &[]).await?;
        Ok(resp.url.filter(|u| !u.is_empty()))
    }

    /// Fetch document bytes from a signed URL.
    ///
    /// Paced like every other request but not counted as an API call, since
    /// the signed URL points at document storage rather than the API.
    pub async fn fetch_content(&mut self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.limiter.acquire().await;
        debug!(url = %url, "GET content");
        self.transport.get(url, &[], RequestKind::Content).await
    }
}
