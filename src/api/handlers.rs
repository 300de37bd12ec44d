use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};

use crate::core::errors::DetectionError;
use crate::core::types::{
    default_active_fields, DetectByMetadataRequest, DetectByNodeRequest, DetectionParams,
    SearchField,
};
use crate::core::AppState;

const REQUEST_DEADLINE: Duration = Duration::from_secs(55);

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "wlo-dedup",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn detect_by_node(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DetectByNodeRequest>,
) -> Response {
    let params = match build_params(&state, body.similarity_threshold, &body.search_fields, body.max_candidates) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };

    run_with_deadline(state.pipeline.detect_by_node(&body.node_id, params)).await
}

pub async fn detect_by_metadata(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DetectByMetadataRequest>,
) -> Response {
    let params = match build_params(&state, body.similarity_threshold, &body.search_fields, body.max_candidates) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };

    run_with_deadline(state.pipeline.detect_by_metadata(body.metadata, params)).await
}

async fn run_with_deadline<F>(fut: F) -> Response
where
    F: std::future::Future<Output = Result<crate::core::types::DetectionResponse, DetectionError>>,
{
    match tokio::time::timeout(REQUEST_DEADLINE, fut).await {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(_) => DetectionError::DeadlineExceeded.into_response(),
    }
}

fn build_params(
    state: &AppState,
    similarity_threshold: Option<f64>,
    search_fields: &Option<Vec<String>>,
    max_candidates: Option<usize>,
) -> Result<DetectionParams, DetectionError> {
    let similarity_threshold = similarity_threshold.unwrap_or(state.config.default_similarity_threshold);
    if !(0.0..=1.0).contains(&similarity_threshold) {
        return Err(DetectionError::InvalidRequest(
            "similarity_threshold must be within [0.0, 1.0]".to_string(),
        ));
    }

    let active_fields = match search_fields {
        Some(fields) if !fields.is_empty() => {
            let mut parsed = std::collections::BTreeSet::new();
            for f in fields {
                match SearchField::parse(f) {
                    Some(field) => {
                        parsed.insert(field);
                    }
                    None => {
                        return Err(DetectionError::InvalidRequest(format!(
                            "unknown search field: {f}"
                        )))
                    }
                }
            }
            parsed
        }
        _ => default_active_fields(),
    };

    let max_candidates = max_candidates.unwrap_or(state.config.max_candidates).max(1);
    let max_candidates = max_candidates.min(state.config.max_candidates);

    Ok(DetectionParams {
        similarity_threshold,
        active_fields,
        max_candidates,
    })
}

pub async fn admin_cache_clear(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let provided = headers
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let Some(expected) = state.config.admin_api_key.as_deref() else {
        return DetectionError::Internal("ADMIN_API_KEY is not configured".to_string())
            .into_response();
    };

    if provided.is_empty() || provided != expected {
        return DetectionError::Unauthorized.into_response();
    }

    let removed = state.cache.purge();
    Json(serde_json::json!({ "purged": removed })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn test_state() -> AppState {
        let mut config = Config::from_env();
        config.max_candidates = 40;
        let client = reqwest::Client::new();
        AppState::new(client, config)
    }

    #[test]
    fn max_candidates_is_clamped_to_the_configured_ceiling() {
        let state = test_state();
        let params = build_params(&state, None, &None, Some(1000)).unwrap();
        assert_eq!(params.max_candidates, 40);
    }

    #[test]
    fn similarity_threshold_out_of_range_is_rejected() {
        let state = test_state();
        let result = build_params(&state, Some(1.5), &None, None);
        assert!(matches!(result, Err(DetectionError::InvalidRequest(_))));
    }

    #[test]
    fn unknown_search_field_is_rejected() {
        let state = test_state();
        let result = build_params(&state, None, &Some(vec!["bogus".to_string()]), None);
        assert!(matches!(result, Err(DetectionError::InvalidRequest(_))));
    }

    #[test]
    fn defaults_are_applied_when_fields_are_omitted() {
        let state = test_state();
        let params = build_params(&state, None, &None, None).unwrap();
        assert_eq!(params.active_fields, default_active_fields());
        assert_eq!(params.similarity_threshold, state.config.default_similarity_threshold);
    }
}
