use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::pipeline::Pipeline;
use crate::rate_limit::RateLimiter;
use crate::upstream::{HttpUpstreamClient, UpstreamClient};

use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
    pub cache: Arc<ResponseCache>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("wlo_base_url", &self.config.wlo_base_url)
            .field("outbound_limit", &self.config.outbound_limit)
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client, config: Config) -> Self {
        let config = Arc::new(config);

        let upstream: Arc<dyn UpstreamClient> = Arc::new(HttpUpstreamClient::new(
            http_client.clone(),
            config.wlo_base_url.clone(),
            config.max_retries,
        ));

        let pipeline = Arc::new(Pipeline::new(upstream, config.outbound_limit));

        let cache = Arc::new(ResponseCache::new(
            config.detection_cache_ttl,
            config.detection_cache_max_size,
        ));

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            std::time::Duration::from_secs(60),
        ));

        Self {
            http_client,
            config,
            pipeline,
            cache,
            rate_limiter,
        }
    }
}
