//! Long-running literature-review jobs as exchanged with the analysis service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filters::{DEFAULT_LIMIT, FilterSet};

/// Status reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Failed,
}

/// The reduced filter shape the job endpoint echoes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFilters {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub venues: Vec<String>,
    pub limit: u32,
}

impl Default for JobFilters {
    fn default() -> Self {
        Self {
            start_year: None,
            end_year: None,
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            venues: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A job record. Owned by the service; the client only caches the last one seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub topic: String,
    /// ISO 8601 timestamp string.
    pub created_at: String,
    #[serde(default)]
    pub filters: JobFilters,
    pub status: JobStatus,
    #[serde(default)]
    pub markdown_path: Option<String>,
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub csv_path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Job {
    pub fn artifact_path(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Markdown => self.markdown_path.as_deref(),
            ArtifactKind::Json => self.json_path.as_deref(),
            ArtifactKind::Csv => self.csv_path.as_deref(),
        }
    }
}

/// Downloadable report artifacts of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Markdown,
    Json,
    Csv,
}

impl ArtifactKind {
    /// Path segment used by the download endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown artifact kind: {other} (expected md, json or csv)")),
        }
    }
}

/// LLM backend the service should use for summarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Body of `POST /run`. Keyword lists travel comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    pub include: String,
    pub exclude: String,
    pub venues: String,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<LlmProvider>,
}

impl RunRequest {
    pub fn new(topic: impl Into<String>, filters: &FilterSet) -> Self {
        let join = |items: &indexmap::IndexSet<String>| {
            items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        };
        Self {
            topic: topic.into().trim().to_string(),
            start_year: filters.time_range.start,
            end_year: filters.time_range.end,
            include: join(&filters.include_keywords),
            exclude: join(&filters.exclude_keywords),
            venues: join(&filters.venues),
            limit: filters.limit,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Client-side lifecycle of a job: `Submitted → Running → {Done, Failed}`.
///
/// Terminal phases are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Submitted,
    Running,
    Done,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Advance on an observed service status.
    pub fn observe(self, status: JobStatus) -> Self {
        if self.is_terminal() {
            return self;
        }
        match status {
            JobStatus::Running => Self::Running,
            JobStatus::Done => Self::Done,
            JobStatus::Failed => Self::Failed,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
