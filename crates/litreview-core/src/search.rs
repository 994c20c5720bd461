//! Search, related-paper, and question-answering wire types.

use serde::{Deserialize, Serialize};

use crate::filters::FilterSet;
use crate::session::SearchIntent;

/// Retrieval mode used when none is given.
pub const DEFAULT_MODE: &str = "hybrid";

/// Related papers requested per paper when none is given.
pub const DEFAULT_RELATED_K: u32 = 10;

/// Parameters of `GET /api/search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub q: String,
    pub mode: String,
    pub k: u32,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub venues: Vec<String>,
    pub must_have_pdf: bool,
    pub oa_only: bool,
    pub review_filter: Option<String>,
}

impl SearchRequest {
    /// Translate a filter set into search parameters. The utterance text is the
    /// query string; the result cap becomes `k`.
    pub fn from_filters(filters: &FilterSet) -> Self {
        let q = filters
            .natural_language_text
            .clone()
            .unwrap_or_else(|| keyword_query(filters));
        Self {
            q,
            mode: DEFAULT_MODE.to_string(),
            k: filters.limit,
            start_year: filters.time_range.start,
            end_year: filters.time_range.end,
            include_keywords: filters.include_keywords.iter().cloned().collect(),
            exclude_keywords: filters.exclude_keywords.iter().cloned().collect(),
            venues: filters.venues.iter().cloned().collect(),
            must_have_pdf: false,
            oa_only: filters.access.open_access,
            review_filter: None,
        }
    }

    /// Request for a session search. The parser's search terms are the query
    /// string rather than the raw utterance, falling back to the required
    /// keywords when no utterance had any.
    pub fn from_intent(intent: &SearchIntent) -> Self {
        let mut request = Self::from_filters(&intent.filters);
        request.q = intent
            .query
            .clone()
            .unwrap_or_else(|| keyword_query(&intent.filters));
        request
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Query-string pairs. Optional parameters are omitted when unset; lists
    /// travel comma-joined.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("mode", self.mode.clone()),
            ("k", self.k.to_string()),
        ];
        if let Some(start) = self.start_year {
            pairs.push(("start_year", start.to_string()));
        }
        if let Some(end) = self.end_year {
            pairs.push(("end_year", end.to_string()));
        }
        let lists = [
            ("include_keywords", &self.include_keywords),
            ("exclude_keywords", &self.exclude_keywords),
            ("venues", &self.venues),
        ];
        for (key, items) in lists {
            if !items.is_empty() {
                pairs.push((key, items.join(",")));
            }
        }
        if self.must_have_pdf {
            pairs.push(("must_have_pdf", "true".to_string()));
        }
        if self.oa_only {
            pairs.push(("oa_only", "true".to_string()));
        }
        if let Some(review) = &self.review_filter {
            pairs.push(("review_filter", review.clone()));
        }
        pairs
    }
}

fn keyword_query(filters: &FilterSet) -> String {
    filters
        .include_keywords
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A paper record. Fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub citations_count: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: String,
    pub total_results: u64,
    #[serde(default)]
    pub papers: Vec<Paper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedRequest {
    pub paper_id: String,
    pub k: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedPaper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

/// The related endpoint answers either with a bare list or wrapped with insights.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelatedResponse {
    List(Vec<RelatedPaper>),
    Wrapped { related: Vec<RelatedPaper> },
}

impl RelatedResponse {
    pub fn into_papers(self) -> Vec<RelatedPaper> {
        match self {
            Self::List(papers) | Self::Wrapped { related: papers } => papers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaRequest {
    pub question: String,
    pub paper_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QaAnswer {
    #[serde(default)]
    pub answer: String,
}
