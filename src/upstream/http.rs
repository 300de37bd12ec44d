use std::time::Duration;

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;
use tracing::warn;

use crate::core::types::{Metadata, SearchField};

use super::{UpstreamClient, UpstreamError, UpstreamHit};

const SEARCH_PAGE_SIZE: usize = 100;

/// Talks to the learning-object repository's node-metadata and
/// field-scoped search endpoints over HTTP.
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct NodeMetadataResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<NodeMetadataResponse> for Metadata {
    fn from(r: NodeMetadataResponse) -> Self {
        Metadata {
            title: r.title,
            description: r.description,
            keywords: r.keywords,
            url: r.url,
            redirect_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHitWire {
    node_id: String,
    #[serde(flatten)]
    metadata: NodeMetadataResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponseWire {
    #[serde(default)]
    results: Vec<SearchHitWire>,
}

impl HttpUpstreamClient {
    pub fn new(client: reqwest::Client, base_url: String, max_retries: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        }
    }

    fn backoff_policy(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(2) * self.max_retries.max(1)))
            .build()
    }

    /// Issues one page of a field-scoped search, retrying transient
    /// failures and mapping 4xx responses straight to a non-retried error.
    async fn search_page(
        &self,
        field: SearchField,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UpstreamHit>, UpstreamError> {
        let url = format!("{}/search", self.base_url);
        let field = field.as_str();

        let result = retry(self.backoff_policy(), || async {
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("field", field),
                    ("query", query),
                    ("limit", &limit.to_string()),
                    ("offset", &offset.to_string()),
                ])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(UpstreamError::Transient(e.to_string())))?;

            let status = resp.status();
            if status.is_client_error() {
                let body = resp.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(UpstreamError::Fatal(format!(
                    "search returned {status}: {body}"
                ))));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(UpstreamError::Transient(format!(
                    "search returned {status}"
                ))));
            }

            resp.json::<SearchResponseWire>()
                .await
                .map_err(|e| backoff::Error::transient(UpstreamError::Transient(e.to_string())))
        })
        .await?;

        Ok(result
            .results
            .into_iter()
            .map(|hit| UpstreamHit {
                node_id: hit.node_id,
                metadata: hit.metadata.into(),
            })
            .collect())
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch_metadata(&self, node_id: &str) -> Result<Metadata, UpstreamError> {
        let url = format!("{}/nodes/{}/metadata", self.base_url, node_id);

        retry(self.backoff_policy(), || async {
            let resp = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(UpstreamError::Transient(e.to_string()))
            })?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(backoff::Error::permanent(UpstreamError::NotFound));
            }
            if resp.status().is_client_error() {
                let status = resp.status();
                return Err(backoff::Error::permanent(UpstreamError::Fatal(format!(
                    "metadata fetch returned {status}"
                ))));
            }
            if resp.status().is_server_error() {
                return Err(backoff::Error::transient(UpstreamError::Transient(format!(
                    "metadata fetch returned {}",
                    resp.status()
                ))));
            }

            let wire: NodeMetadataResponse = resp.json().await.map_err(|e| {
                backoff::Error::transient(UpstreamError::Transient(e.to_string()))
            })?;
            Ok(wire.into())
        })
        .await
    }

    async fn search(
        &self,
        field: SearchField,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<UpstreamHit>, UpstreamError> {
        let mut out = Vec::with_capacity(max_results.min(SEARCH_PAGE_SIZE));
        let mut offset = 0usize;

        loop {
            let remaining = max_results.saturating_sub(out.len());
            if remaining == 0 {
                break;
            }
            let page_limit = remaining.min(SEARCH_PAGE_SIZE);
            let page = self.search_page(field, query, page_limit, offset).await?;
            let page_len = page.len();
            out.extend(page);

            if out.len() >= max_results || page_len < SEARCH_PAGE_SIZE {
                break;
            }
            offset += SEARCH_PAGE_SIZE;
        }

        out.truncate(max_results);
        Ok(out)
    }

    async fn check_redirect(&self, url: &str) -> String {
        match self.client.head(url).send().await {
            Ok(resp) => resp.url().to_string(),
            Err(e) => {
                warn!("redirect check failed for {url}: {e}");
                url.to_string()
            }
        }
    }
}
