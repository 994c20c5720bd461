//! Seams to the remote analysis service and its failure taxonomy.

use std::future::Future;

use async_trait::async_trait;
use litreview_core::{
    ArtifactKind, ExportFormat, FilterSet, Job, RelatedPaper, RunRequest, SearchRequest,
    SearchResponse,
};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The status line arrived but reading the body failed.
    #[cfg(feature = "http")]
    #[error("reading response body failed: {0}")]
    Body(#[source] reqwest::Error),
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("server returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a failed call should be treated by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received; safe to retry.
    Transient,
    /// The service answered with an error; surfaced without retry.
    Remote,
}

impl ServiceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            #[cfg(feature = "http")]
            Self::Http(e) if e.is_decode() || e.is_status() => FailureKind::Remote,
            #[cfg(feature = "http")]
            Self::Http(_) => FailureKind::Transient,
            #[cfg(feature = "http")]
            Self::Body(_) => FailureKind::Remote,
            Self::Unreachable(_) => FailureKind::Transient,
            Self::Remote { .. } | Self::Json(_) => FailureKind::Remote,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Long-running review jobs.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn run_job(&self, request: &RunRequest) -> Result<Job, ServiceError>;

    /// All known jobs, most recent first.
    async fn list_jobs(&self) -> Result<Vec<Job>, ServiceError>;

    async fn job_result(&self, job_id: &str) -> Result<Job, ServiceError>;

    async fn download(&self, job_id: &str, kind: ArtifactKind) -> Result<Vec<u8>, ServiceError>;
}

/// Interactive search over the paper index.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError>;

    async fn related(&self, paper_id: &str, k: u32) -> Result<Vec<RelatedPaper>, ServiceError>;

    async fn ask(&self, question: &str, paper_ids: &[String]) -> Result<String, ServiceError>;
}

/// Server-side rendering of a result set into a downloadable encoding.
#[async_trait]
pub trait ExportService: Send + Sync {
    async fn export(
        &self,
        format: ExportFormat,
        query: &FilterSet,
        results: &SearchResponse,
    ) -> Result<Vec<u8>, ServiceError>;
}

/// Run `op`, retrying once if the first attempt got no response.
pub async fn retry_transient<T, F, Fut>(what: &str, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            warn!(call = what, error = %e, "transient failure, retrying once");
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn classification() {
        assert!(ServiceError::Unreachable("refused".into()).is_transient());
        let remote = ServiceError::Remote { status: 500, body: "boom".into() };
        assert_eq!(remote.kind(), FailureKind::Remote);
        let json = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(ServiceError::from(json).kind(), FailureKind::Remote);
    }

    #[tokio::test]
    async fn retries_transient_exactly_once() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<(), _> = retry_transient("test", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Unreachable("down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_then_success() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result = retry_transient("test", move || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ServiceError::Unreachable("blip".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn remote_failure_is_not_retried() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<(), _> = retry_transient("test", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Remote { status: 404, body: "missing".into() })
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Remote { status: 404, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
