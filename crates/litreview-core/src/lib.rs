//! Query model and refinement engine for the literature-review client.

pub mod config;
pub mod export;
pub mod filters;
pub mod fragment;
pub mod job;
pub mod merge;
pub mod search;
pub mod session;

pub use config::ServiceConfig;
pub use export::{ExportFormat, ExportRequest};
pub use filters::{
    AccessFlags, Constraint, EvidenceFlags, FieldValue, FilterError, FilterField, FilterSet,
    TimeRange, DEFAULT_LIMIT,
};
pub use fragment::ParsedFragment;
pub use job::{ArtifactKind, Job, JobFilters, JobPhase, JobStatus, LlmProvider, RunRequest};
pub use merge::merge;
pub use search::{
    Paper, QaAnswer, QaRequest, RelatedPaper, RelatedRequest, RelatedResponse, SearchRequest,
    SearchResponse,
};
pub use session::{
    QueryContext, QueryParser, RefinementSession, SearchIntent, SessionError, SubmitMode,
};
