use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

use crate::cache::{compute_key, CacheKeyParts};
use crate::core::errors::DetectionError;
use crate::core::types::DetectByMetadataRequest;
use crate::core::AppState;
use crate::normalize;

const MAX_BODY_BYTES: usize = 1 << 20;

/// Rejects malformed JSON bodies before they reach rate limiting or the
/// handler, so an attacker can't burn rate-limit tokens with garbage.
pub async fn validate_request(req: Request<Body>, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => {
            return DetectionError::InvalidRequest("request body too large".to_string())
                .into_response()
        }
    };

    if parts.uri.path().starts_with("/detect/") && !bytes.is_empty() {
        if let Err(e) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            return DetectionError::InvalidRequest(format!("malformed JSON body: {e}"))
                .into_response();
        }
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}

/// Per-IP token bucket gate for `/detect/*` routes.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    if !state.rate_limiter.check(ip) {
        debug!("rate limit exceeded for {ip}");
        return DetectionError::RateLimited {
            retry_after_secs: 60,
        }
        .into_response();
    }

    next.run(req).await
}

/// Looks the request up in the response cache before invoking the handler,
/// and stores a successful response afterward. Only `by-metadata` requests
/// are cacheable (§4.6): a by-node-id result depends on upstream state not
/// observable here.
pub async fn cache_lookup(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let is_by_metadata = req.uri().path() == "/detect/hash/by-metadata";
    if !is_by_metadata {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => {
            return DetectionError::InvalidRequest("request body too large".to_string())
                .into_response()
        }
    };

    let parsed: Result<DetectByMetadataRequest, _> = serde_json::from_slice(&bytes);
    let Ok(parsed) = parsed else {
        let req = Request::from_parts(parts, Body::from(bytes));
        return next.run(req).await;
    };

    let key = cache_key_for(&parsed, &state);

    if let Some(cached) = state.cache.get(key) {
        info!("cache hit for by-metadata request");
        return axum::Json(cached).into_response();
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(req).await;

    if response.status().is_success() {
        if let Ok(body_bytes) = to_bytes(response.into_body(), MAX_BODY_BYTES).await {
            if let Ok(parsed_response) =
                serde_json::from_slice::<crate::core::types::DetectionResponse>(&body_bytes)
            {
                state.cache.insert(key, parsed_response);
            }
            return Response::builder()
                .status(axum::http::StatusCode::OK)
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body_bytes))
                .expect("static response parts are always valid");
        }
        return DetectionError::Internal("failed to read response body".to_string())
            .into_response();
    }

    response
}

fn cache_key_for(req: &DetectByMetadataRequest, state: &AppState) -> u64 {
    let mut keywords = req.metadata.keywords.clone();
    keywords.sort();

    let active_fields: Vec<&'static str> = req
        .search_fields
        .as_ref()
        .map(|fields| {
            let mut parsed: Vec<&'static str> = fields
                .iter()
                .filter_map(|f| crate::core::types::SearchField::parse(f))
                .map(|f| f.as_str())
                .collect();
            parsed.sort();
            parsed
        })
        .unwrap_or_else(|| {
            crate::core::types::default_active_fields()
                .into_iter()
                .map(|f| f.as_str())
                .collect()
        });

    let description_prefix: String = req
        .metadata
        .description
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(100)
        .collect();

    let parts = CacheKeyParts {
        normalized_title: req
            .metadata
            .title
            .as_deref()
            .map(normalize::normalize_title)
            .unwrap_or_default(),
        normalized_description_prefix: normalize::normalize_title(&description_prefix),
        normalized_url: req
            .metadata
            .url
            .as_deref()
            .map(normalize::normalize_url)
            .unwrap_or_default(),
        sorted_keywords: keywords,
        similarity_threshold: req
            .similarity_threshold
            .unwrap_or(state.config.default_similarity_threshold),
        active_fields,
        max_candidates: req.max_candidates.unwrap_or(state.config.max_candidates),
    };

    compute_key(&parts)
}
