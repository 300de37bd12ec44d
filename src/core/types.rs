use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A learning-object metadata record. All four fields are optional; a record
/// is only useful to the pipeline once it is [`Metadata::is_searchable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Populated by the upstream client when `url` redirects elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl Metadata {
    /// A record is searchable iff at least one field is non-empty after trimming.
    pub fn is_searchable(&self) -> bool {
        non_empty(&self.title)
            || non_empty(&self.description)
            || non_empty(&self.url)
            || self.keywords.iter().any(|k| !k.trim().is_empty())
    }

    pub fn empty_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !non_empty(&self.title) {
            out.push("title");
        }
        if !non_empty(&self.description) {
            out.push("description");
        }
        if !non_empty(&self.url) {
            out.push("url");
        }
        out
    }

    pub fn field(&self, name: SearchField) -> Option<String> {
        match name {
            SearchField::Title => self.title.clone(),
            SearchField::Description => self.description.clone(),
            SearchField::Url => self.url.clone(),
            SearchField::Keywords => {
                if self.keywords.is_empty() {
                    None
                } else {
                    Some(self.keywords.join(" "))
                }
            }
        }
    }
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_ref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Which metadata field produced a candidate, or the authoritative URL-exact tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    UrlExact,
    Title,
    Description,
    Keywords,
    Url,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::UrlExact => "url_exact",
            MatchSource::Title => "title",
            MatchSource::Description => "description",
            MatchSource::Keywords => "keywords",
            MatchSource::Url => "url",
        }
    }
}

/// A field the recruiter is allowed to search over. `keywords` is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Description,
    Keywords,
    Url,
}

impl SearchField {
    pub const DEFAULT_ACTIVE: [SearchField; 3] =
        [SearchField::Title, SearchField::Description, SearchField::Url];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Description => "description",
            SearchField::Keywords => "keywords",
            SearchField::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Some(SearchField::Title),
            "description" => Some(SearchField::Description),
            "keywords" => Some(SearchField::Keywords),
            "url" => Some(SearchField::Url),
            _ => None,
        }
    }

    /// MatchSource a bare discovery on this field is tagged with.
    pub fn as_match_source(&self) -> MatchSource {
        match self {
            SearchField::Title => MatchSource::Title,
            SearchField::Description => MatchSource::Description,
            SearchField::Keywords => MatchSource::Keywords,
            SearchField::Url => MatchSource::Url,
        }
    }
}

pub fn default_active_fields() -> BTreeSet<SearchField> {
    SearchField::DEFAULT_ACTIVE.into_iter().collect()
}

/// One accumulated candidate node during a single detection run.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node_id: String,
    pub metadata: Metadata,
    pub match_source: MatchSource,
    pub discovery_field: SearchField,
    pub similarity_score: f64,
}

/// A [`Candidate`] that survived the acceptance rule in phase 5.
#[derive(Debug, Clone, Serialize)]
pub struct Duplicate {
    pub node_id: String,
    pub metadata: Metadata,
    pub match_source: MatchSource,
    pub similarity_score: f64,
}

/// Per-field bookkeeping surfaced to the caller so a response explains itself.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSearchResult {
    pub field: SearchField,
    pub original_value: String,
    pub original_hit_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<String>,
    pub normalized_hit_count: usize,
    pub candidates_added: usize,
    pub max_similarity: f64,
}

/// Records that source metadata was completed from a highly-confident candidate.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub source_node_id: String,
    pub source_field: EnrichmentSourceField,
    pub fields_added: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSourceField {
    Url,
    Title,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionResponse {
    pub source_metadata: Metadata,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentReport>,
    pub candidate_search_results: Vec<FieldSearchResult>,
    pub total_candidates_checked: usize,
    pub duplicates: Vec<Duplicate>,
}

// --- HTTP request bodies ---

#[derive(Debug, Clone, Deserialize)]
pub struct DetectByNodeRequest {
    pub node_id: String,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub search_fields: Option<Vec<String>>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectByMetadataRequest {
    pub metadata: Metadata,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub search_fields: Option<Vec<String>>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Parameters shared by both entry points once request validation succeeds.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    pub similarity_threshold: f64,
    pub active_fields: BTreeSet<SearchField>,
    pub max_candidates: usize,
}
