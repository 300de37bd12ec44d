//! The multi-phase duplicate-detection pipeline.
//!
//! States: `INIT -> METADATA_READY -> RECRUITED ->
//! {ENRICHED_AND_RE_RECRUITED | SKIP_ENRICH} -> URL_CHECKED -> SCORED ->
//! ASSEMBLED`, with terminal failures `NOT_SEARCHABLE`, `NODE_NOT_FOUND`,
//! `UPSTREAM_FATAL`. Phase k strictly happens-before phase k+1; there is no
//! racing between enrichment, the URL-exact pass, and scoring.

use std::sync::Arc;

use crate::core::errors::DetectionError;
use crate::core::types::{
    Candidate, DetectionParams, DetectionResponse, Duplicate, EnrichmentReport,
    EnrichmentSourceField, Metadata, SearchField,
};
use crate::minhash;
use crate::normalize;
use crate::recruiter::{self, RecruitmentOutcome};
use crate::upstream::UpstreamClient;

const MIN_TITLE_ENRICHMENT_SIMILARITY: f64 = 0.7;
const SCORING_DESCRIPTION_CHARS: usize = 200;

pub struct Pipeline {
    upstream: Arc<dyn UpstreamClient>,
    recruit_concurrency: usize,
}

impl Pipeline {
    pub fn new(upstream: Arc<dyn UpstreamClient>, recruit_concurrency: usize) -> Self {
        Self {
            upstream,
            recruit_concurrency,
        }
    }

    /// Phase 1 (by-node-id variant) + the rest of the pipeline.
    pub async fn detect_by_node(
        &self,
        node_id: &str,
        params: DetectionParams,
    ) -> Result<DetectionResponse, DetectionError> {
        let metadata = self
            .upstream
            .fetch_metadata(node_id)
            .await
            .map_err(|_| DetectionError::NodeNotFound(node_id.to_string()))?;

        self.run(metadata, Some(node_id.to_string()), params).await
    }

    /// Phase 1 (by-metadata variant) + the rest of the pipeline.
    pub async fn detect_by_metadata(
        &self,
        metadata: Metadata,
        params: DetectionParams,
    ) -> Result<DetectionResponse, DetectionError> {
        self.run(metadata, None, params).await
    }

    async fn run(
        &self,
        mut source: Metadata,
        source_node_id: Option<String>,
        params: DetectionParams,
    ) -> Result<DetectionResponse, DetectionError> {
        if !source.is_searchable() {
            return Err(DetectionError::NotSearchable);
        }

        // Phase 2 — initial recruitment.
        let mut outcome = self.recruit(&source, &params).await;

        // Phase 3 — enrichment (at most one pass).
        let enrichment = self.try_enrich(&mut source, &outcome.candidates);
        if enrichment.is_some() {
            outcome = self.recruit(&source, &params).await;
        }

        // Phase 4 — URL-exact pass.
        let source_url_key = source
            .url
            .as_deref()
            .map(normalize::normalize_url)
            .filter(|k| !k.is_empty());
        for candidate in outcome.candidates.values_mut() {
            if let Some(source_key) = &source_url_key {
                let candidate_key = candidate
                    .metadata
                    .url
                    .as_deref()
                    .map(normalize::normalize_url)
                    .filter(|k| !k.is_empty());
                if candidate_key.as_deref() == Some(source_key.as_str()) {
                    candidate.match_source = crate::core::types::MatchSource::UrlExact;
                    candidate.similarity_score = 1.0;
                }
            }
        }

        // Phase 5 — similarity scoring.
        let total_candidates_checked = outcome.candidates.len();
        let source_scoring_text = scoring_text(&source);
        let mut field_max_similarity: std::collections::HashMap<SearchField, f64> =
            std::collections::HashMap::new();

        let mut survivors: Vec<Candidate> = Vec::new();
        for candidate in outcome.candidates.into_values() {
            if matches!(candidate.match_source, crate::core::types::MatchSource::UrlExact) {
                field_max_similarity
                    .entry(candidate.discovery_field)
                    .and_modify(|m| *m = m.max(1.0))
                    .or_insert(1.0);
                survivors.push(candidate);
                continue;
            }

            let candidate_scoring_text = scoring_text(&candidate.metadata);
            let score = minhash::text_similarity(&source_scoring_text, &candidate_scoring_text);

            field_max_similarity
                .entry(candidate.discovery_field)
                .and_modify(|m| *m = m.max(score))
                .or_insert(score);

            if score >= params.similarity_threshold {
                let mut candidate = candidate;
                candidate.similarity_score = score;
                survivors.push(candidate);
            }
        }

        for result in &mut outcome.field_results {
            if let Some(max) = field_max_similarity.get(&result.field) {
                result.max_similarity = *max;
            }
        }

        // Phase 6 — assembly.
        let mut duplicates: Vec<Duplicate> = survivors
            .into_iter()
            .filter(|c| Some(&c.node_id) != source_node_id.as_ref())
            .map(|c| Duplicate {
                node_id: c.node_id,
                metadata: c.metadata,
                match_source: c.match_source,
                similarity_score: c.similarity_score,
            })
            .collect();

        duplicates.sort_by(|a, b| {
            let a_exact = matches!(a.match_source, crate::core::types::MatchSource::UrlExact);
            let b_exact = matches!(b.match_source, crate::core::types::MatchSource::UrlExact);
            b_exact
                .cmp(&a_exact)
                .then_with(|| b.similarity_score.partial_cmp(&a.similarity_score).unwrap())
                .then_with(|| a.node_id.cmp(&b.node_id))
        });

        Ok(DetectionResponse {
            source_metadata: source,
            threshold: params.similarity_threshold,
            enrichment,
            candidate_search_results: outcome.field_results,
            total_candidates_checked,
            duplicates,
        })
    }

    async fn recruit(&self, metadata: &Metadata, params: &DetectionParams) -> RecruitmentOutcome {
        recruiter::recruit(
            &self.upstream,
            metadata,
            &params.active_fields,
            params.max_candidates,
            self.recruit_concurrency,
        )
        .await
    }

    /// Phase 3: if the source is missing a field, copy it in from the
    /// best enrichment candidate (url_exact first, else the
    /// highest-similarity title-sourced candidate with score >= 0.7; ties
    /// broken by highest similarity then lexicographically smallest
    /// node_id). Returns `None` if no field was added.
    fn try_enrich(
        &self,
        source: &mut Metadata,
        candidates: &std::collections::HashMap<String, Candidate>,
    ) -> Option<EnrichmentReport> {
        let missing = source.empty_fields();
        if missing.is_empty() {
            return None;
        }

        // Phase 4's url_exact tagging hasn't run yet, so find a url-exact
        // donor with the same normalized-URL comparison ahead of time.
        let source_url_key = source
            .url
            .as_deref()
            .map(normalize::normalize_url)
            .filter(|k| !k.is_empty());
        let url_exact = source_url_key.as_ref().and_then(|source_key| {
            candidates.values().find(|c| {
                c.metadata
                    .url
                    .as_deref()
                    .map(normalize::normalize_url)
                    .filter(|k| !k.is_empty())
                    .as_deref()
                    == Some(source_key.as_str())
            })
        });

        let (donor, source_field) = if let Some(candidate) = url_exact {
            (candidate, EnrichmentSourceField::Url)
        } else {
            // Phase 5 scoring hasn't run yet either, so score title-sourced
            // candidates against the source's current title ad hoc.
            let source_title = source.title.as_deref().unwrap_or("");
            let best_title = candidates
                .values()
                .filter(|c| matches!(c.discovery_field, SearchField::Title))
                .filter_map(|c| {
                    let candidate_title = c.metadata.title.as_deref().unwrap_or("");
                    if source_title.is_empty() || candidate_title.is_empty() {
                        return None;
                    }
                    let score = minhash::text_similarity(source_title, candidate_title);
                    (score >= MIN_TITLE_ENRICHMENT_SIMILARITY).then_some((c, score))
                })
                .max_by(|(a, a_score), (b, b_score)| {
                    a_score
                        .partial_cmp(b_score)
                        .unwrap()
                        .then_with(|| b.node_id.cmp(&a.node_id))
                })
                .map(|(c, _)| c);
            match best_title {
                Some(candidate) => (candidate, EnrichmentSourceField::Title),
                None => return None,
            }
        };

        let mut fields_added = Vec::new();
        if source.title.is_none() || source.title.as_deref() == Some("") {
            if let Some(title) = donor.metadata.title.clone().filter(|s| !s.trim().is_empty()) {
                source.title = Some(title);
                fields_added.push("title".to_string());
            }
        }
        if source.description.is_none() || source.description.as_deref() == Some("") {
            if let Some(desc) = donor
                .metadata
                .description
                .clone()
                .filter(|s| !s.trim().is_empty())
            {
                source.description = Some(desc);
                fields_added.push("description".to_string());
            }
        }
        if source.url.is_none() || source.url.as_deref() == Some("") {
            if let Some(url) = donor.metadata.url.clone().filter(|s| !s.trim().is_empty()) {
                source.url = Some(url);
                fields_added.push("url".to_string());
            }
        }

        if fields_added.is_empty() {
            return None;
        }

        Some(EnrichmentReport {
            source_node_id: donor.node_id.clone(),
            source_field,
            fields_added,
        })
    }
}

/// Text used for Phase 5 scoring: title concatenated with the first 200
/// characters of the description, if present.
fn scoring_text(metadata: &Metadata) -> String {
    let title = metadata.title.as_deref().unwrap_or("");
    let description: String = metadata
        .description
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(SCORING_DESCRIPTION_CHARS)
        .collect();
    format!("{title} {description}").trim().to_string()
}
