//! Abstraction over the learning-object repository this service queries.

mod http;

pub use http::HttpUpstreamClient;

use crate::core::types::{Metadata, SearchField};
use async_trait::async_trait;

/// A single upstream search hit.
#[derive(Debug, Clone)]
pub struct UpstreamHit {
    pub node_id: String,
    pub metadata: Metadata,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("node not found")]
    NotFound,
    #[error("upstream request failed: {0}")]
    Transient(String),
    #[error("upstream request failed permanently: {0}")]
    Fatal(String),
}

/// Mirrors `tools::search::SearchService`: the pipeline and recruiter depend
/// only on this trait object, never on the concrete HTTP client, so both can
/// run against a fake implementation in tests.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_metadata(&self, node_id: &str) -> Result<Metadata, UpstreamError>;

    async fn search(
        &self,
        field: SearchField,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<UpstreamHit>, UpstreamError>;

    /// Best-effort final URL after following redirects. Never blocks the
    /// pipeline beyond the client's configured timeout; on any failure,
    /// returns the original URL unchanged.
    async fn check_redirect(&self, url: &str) -> String;
}
