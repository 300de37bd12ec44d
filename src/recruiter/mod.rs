//! Candidate recruitment: turns source metadata into a merged, deduplicated
//! candidate set by fanning queries out to the upstream client.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::core::types::{Candidate, FieldSearchResult, Metadata, SearchField};
use crate::normalize;
use crate::upstream::UpstreamClient;

pub struct RecruitmentOutcome {
    pub candidates: HashMap<String, Candidate>,
    pub field_results: Vec<FieldSearchResult>,
}

struct Query {
    field: SearchField,
    text: String,
    normalized: Option<String>,
}

/// Recruit candidates for `metadata` over `active_fields`, fanning all
/// generated queries out through a bounded worker pool of `concurrency`
/// (realized as `tokio::sync::Semaphore` guarding a `FuturesUnordered`, the
/// same "bounded fan-out" idiom `AppState::outbound_limit` already
/// establishes for outbound calls elsewhere in this codebase).
pub async fn recruit(
    upstream: &Arc<dyn UpstreamClient>,
    metadata: &Metadata,
    active_fields: &BTreeSet<SearchField>,
    max_candidates: usize,
    concurrency: usize,
) -> RecruitmentOutcome {
    let queries = build_queries(metadata, active_fields);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let mut tasks = FuturesUnordered::new();
    for query in queries {
        let semaphore = Arc::clone(&semaphore);
        let upstream = Arc::clone(upstream);
        tasks.push(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            let hits = upstream
                .search(query.field, &query.text, max_candidates)
                .await
                .unwrap_or_else(|e| {
                    warn!("recruitment query failed for field {:?}: {e}", query.field);
                    Vec::new()
                });
            (query, hits)
        });
    }

    let mut candidates: HashMap<String, Candidate> = HashMap::new();
    let mut per_field: HashMap<SearchField, FieldAccumulator> = HashMap::new();

    while let Some((query, hits)) = tasks.next().await {
        let acc = per_field.entry(query.field).or_insert_with(|| FieldAccumulator {
            original_value: query_original_value(metadata, query.field),
            original_hit_count: 0,
            normalized_value: None,
            normalized_hit_count: 0,
            candidates_added: 0,
            max_similarity: 0.0,
        });

        let is_normalized_query = query.normalized.as_deref() == Some(query.text.as_str());
        if is_normalized_query {
            acc.normalized_value = query.normalized.clone();
            acc.normalized_hit_count += hits.len();
        } else {
            acc.original_hit_count += hits.len();
        }

        for hit in hits {
            if hit.node_id.is_empty() {
                continue;
            }
            candidates
                .entry(hit.node_id.clone())
                .and_modify(|_| {
                    // First-discovery-wins: do not overwrite an already-recorded candidate.
                })
                .or_insert_with(|| {
                    acc.candidates_added += 1;
                    Candidate {
                        node_id: hit.node_id.clone(),
                        metadata: hit.metadata,
                        match_source: query.field.as_match_source(),
                        discovery_field: query.field,
                        similarity_score: 0.0,
                    }
                });
        }
    }

    let field_results = active_fields
        .iter()
        .filter_map(|field| per_field.remove(field).map(|acc| acc.into_result(*field)))
        .collect();

    RecruitmentOutcome {
        candidates,
        field_results,
    }
}

struct FieldAccumulator {
    original_value: String,
    original_hit_count: usize,
    normalized_value: Option<String>,
    normalized_hit_count: usize,
    candidates_added: usize,
    max_similarity: f64,
}

impl FieldAccumulator {
    fn into_result(self, field: SearchField) -> FieldSearchResult {
        FieldSearchResult {
            field,
            original_value: self.original_value,
            original_hit_count: self.original_hit_count,
            normalized_value: self.normalized_value,
            normalized_hit_count: self.normalized_hit_count,
            candidates_added: self.candidates_added,
            max_similarity: self.max_similarity,
        }
    }
}

fn query_original_value(metadata: &Metadata, field: SearchField) -> String {
    metadata.field(field).unwrap_or_default()
}

/// Builds every query string for every active field, per the generation
/// rules: `title` gets the original + normalized + all variants;
/// `description` gets its first 100 characters; `keywords` gets one
/// space-joined query; `url` gets the original and normalized form.
fn build_queries(metadata: &Metadata, active_fields: &BTreeSet<SearchField>) -> Vec<Query> {
    let mut queries = Vec::new();

    if active_fields.contains(&SearchField::Title) {
        if let Some(title) = metadata.title.as_deref().filter(|s| !s.trim().is_empty()) {
            let normalized = normalize::normalize_title(title);
            let mut seen: BTreeSet<String> = BTreeSet::new();

            let mut push = |text: String, normalized: Option<String>| {
                let key = text.to_lowercase();
                if seen.insert(key) {
                    queries.push(Query {
                        field: SearchField::Title,
                        text,
                        normalized,
                    });
                }
            };

            push(title.to_string(), None);
            push(normalized.clone(), Some(normalized.clone()));
            for variant in normalize::title_variants(&normalized) {
                push(variant, Some(normalized.clone()));
            }
        }
    }

    if active_fields.contains(&SearchField::Description) {
        if let Some(desc) = metadata.description.as_deref().filter(|s| !s.trim().is_empty()) {
            let truncated: String = desc.chars().take(100).collect();
            queries.push(Query {
                field: SearchField::Description,
                text: truncated,
                normalized: None,
            });
        }
    }

    if active_fields.contains(&SearchField::Keywords) && !metadata.keywords.is_empty() {
        queries.push(Query {
            field: SearchField::Keywords,
            text: metadata.keywords.join(" "),
            normalized: None,
        });
    }

    if active_fields.contains(&SearchField::Url) {
        if let Some(url) = metadata.url.as_deref().filter(|s| !s.trim().is_empty()) {
            let normalized = normalize::normalize_url(url);
            queries.push(Query {
                field: SearchField::Url,
                text: url.to_string(),
                normalized: None,
            });
            if normalized != url {
                queries.push(Query {
                    field: SearchField::Url,
                    text: normalized.clone(),
                    normalized: Some(normalized),
                });
            }
        }
    }

    queries
}
