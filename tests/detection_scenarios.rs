//! Black-box scenarios against the detection pipeline's public API, run
//! with a fake `UpstreamClient` so no network access is required.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wlo_dedup::core::types::{
    default_active_fields, DetectionParams, Metadata, MatchSource, SearchField,
};
use wlo_dedup::pipeline::Pipeline;
use wlo_dedup::upstream::{UpstreamClient, UpstreamError, UpstreamHit};

struct ScriptedUpstream {
    nodes: HashMap<String, Metadata>,
    by_query: Mutex<HashMap<(SearchField, String), Vec<UpstreamHit>>>,
}

impl ScriptedUpstream {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            by_query: Mutex::new(HashMap::new()),
        }
    }

    fn on(mut self, field: SearchField, query: &str, hits: Vec<UpstreamHit>) -> Self {
        self.by_query
            .get_mut()
            .unwrap()
            .insert((field, query.to_string()), hits);
        self
    }

    fn with_node(mut self, node_id: &str, metadata: Metadata) -> Self {
        self.nodes.insert(node_id.to_string(), metadata);
        self
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn fetch_metadata(&self, node_id: &str) -> Result<Metadata, UpstreamError> {
        self.nodes.get(node_id).cloned().ok_or(UpstreamError::NotFound)
    }

    async fn search(
        &self,
        field: SearchField,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<UpstreamHit>, UpstreamError> {
        Ok(self
            .by_query
            .lock()
            .unwrap()
            .get(&(field, query.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn check_redirect(&self, url: &str) -> String {
        url.to_string()
    }
}

fn params(threshold: f64) -> DetectionParams {
    DetectionParams {
        similarity_threshold: threshold,
        active_fields: default_active_fields(),
        max_candidates: 40,
    }
}

/// Scenario (b): a candidate discovered via a lowercase/umlaut-folded title
/// variant is retained under `match_source = "title"` once its MinHash
/// similarity clears the threshold.
#[tokio::test]
async fn title_variant_recruitment_finds_a_near_duplicate() {
    let source = Metadata {
        title: Some("Mathematik für Grundschüler".to_string()),
        description: None,
        keywords: Vec::new(),
        url: None,
        redirect_url: None,
    };

    let candidate_metadata = Metadata {
        title: Some("mathematik fuer grundschueler".to_string()),
        description: None,
        keywords: Vec::new(),
        url: None,
        redirect_url: None,
    };

    let upstream = ScriptedUpstream::new().on(
        SearchField::Title,
        "mathematik fuer grundschueler",
        vec![UpstreamHit {
            node_id: "node-variant".to_string(),
            metadata: candidate_metadata,
        }],
    );

    let pipeline = Pipeline::new(Arc::new(upstream), 10);
    let response = pipeline
        .detect_by_metadata(source, params(0.5))
        .await
        .unwrap();

    assert!(
        response
            .duplicates
            .iter()
            .any(|d| d.node_id == "node-variant" && matches!(d.match_source, MatchSource::Title)),
        "expected node-variant to survive with match_source=title, got {:?}",
        response.duplicates
    );
}

/// Scenario (c): enrichment fills in missing fields from a url_exact
/// candidate and re-runs recruitment once with the enriched record.
#[tokio::test]
async fn enrichment_fills_missing_fields_from_url_exact_candidate() {
    let source = Metadata {
        title: None,
        description: None,
        keywords: Vec::new(),
        url: Some("https://example.org/lesson-1".to_string()),
        redirect_url: None,
    };

    let donor_metadata = Metadata {
        title: Some("Einfuehrung in die Bruchrechnung".to_string()),
        description: Some("Eine Einfuehrung fuer die Grundschule".to_string()),
        keywords: Vec::new(),
        url: Some("https://example.org/lesson-1".to_string()),
        redirect_url: None,
    };

    let upstream = ScriptedUpstream::new()
        .with_node("source-node", source.clone())
        .on(
            SearchField::Url,
            "https://example.org/lesson-1",
            vec![UpstreamHit {
                node_id: "donor-node".to_string(),
                metadata: donor_metadata,
            }],
        );

    let pipeline = Pipeline::new(Arc::new(upstream), 10);
    let response = pipeline
        .detect_by_node("source-node", params(0.9))
        .await
        .unwrap();

    let enrichment = response.enrichment.expect("expected an enrichment report");
    assert_eq!(enrichment.source_node_id, "donor-node");
    assert!(enrichment.fields_added.contains(&"title".to_string()));
    assert!(enrichment.fields_added.contains(&"description".to_string()));
    assert_eq!(
        response.source_metadata.title.as_deref(),
        Some("Einfuehrung in die Bruchrechnung")
    );
}

/// Property law 1/2 (§8): every reported duplicate clears the threshold or
/// is url_exact, and the source node never appears among its own duplicates.
#[tokio::test]
async fn duplicates_never_include_the_source_node_and_always_clear_the_bar() {
    let source = Metadata {
        title: Some("Der Wasserkreislauf".to_string()),
        description: None,
        keywords: Vec::new(),
        url: Some("https://example.org/water-cycle".to_string()),
        redirect_url: None,
    };

    let upstream = ScriptedUpstream::new().with_node("self-node", source.clone()).on(
        SearchField::Url,
        "https://example.org/water-cycle",
        vec![UpstreamHit {
            node_id: "self-node".to_string(),
            metadata: source.clone(),
        }],
    );

    let pipeline = Pipeline::new(Arc::new(upstream), 10);
    let response = pipeline
        .detect_by_node("self-node", params(0.9))
        .await
        .unwrap();

    for d in &response.duplicates {
        assert_ne!(d.node_id, "self-node");
        assert!(matches!(d.match_source, MatchSource::UrlExact) || d.similarity_score >= 0.9);
    }
}
