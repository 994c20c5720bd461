//! HTTP client for the literature-review analysis service.

use async_trait::async_trait;
use litreview_core::{
    ArtifactKind, ExportFormat, ExportRequest, FilterSet, Job, QaAnswer, QaRequest, RelatedPaper,
    RelatedRequest, RelatedResponse, RunRequest, SearchRequest, SearchResponse, ServiceConfig,
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::service::{ExportService, JobService, SearchService, ServiceError};

/// reqwest-backed implementation of every service seam.
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ServiceError> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await.map_err(ServiceError::Body)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn read_bytes(resp: reqwest::Response) -> Result<Vec<u8>, ServiceError> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await.map_err(ServiceError::Body)?;
        Ok(bytes.to_vec())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl JobService for HttpService {
    async fn run_job(&self, request: &RunRequest) -> Result<Job, ServiceError> {
        let url = self.url("/run");
        info!(url = %url, topic = %request.topic, "submitting review job");
        let resp = self.client.post(&url).json(request).send().await?;
        let job: Job = Self::read_json(resp).await?;
        info!(job_id = %job.job_id, "job accepted");
        Ok(job)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        let url = self.url("/jobs");
        info!(url = %url, "listing jobs");
        let resp = self.client.get(&url).send().await?;
        let jobs: Vec<Job> = Self::read_json(resp).await?;
        info!(count = jobs.len(), "listed jobs");
        Ok(jobs)
    }

    async fn job_result(&self, job_id: &str) -> Result<Job, ServiceError> {
        let url = self.url(&format!("/result/{job_id}"));
        info!(url = %url, "polling job");
        let resp = self.client.get(&url).send().await?;
        Self::read_json(resp).await
    }

    async fn download(&self, job_id: &str, kind: ArtifactKind) -> Result<Vec<u8>, ServiceError> {
        let url = self.url(&format!("/download/{job_id}/{kind}"));
        info!(url = %url, "downloading artifact");
        let resp = self.client.get(&url).send().await?;
        let bytes = Self::read_bytes(resp).await?;
        info!(bytes = bytes.len(), "download complete");
        Ok(bytes)
    }
}

#[async_trait]
impl SearchService for HttpService {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        let url = self.url("/api/search");
        info!(url = %url, q = %request.q, k = request.k, "searching");
        let resp = self
            .client
            .get(&url)
            .query(&request.query_pairs())
            .send()
            .await?;
        let body: SearchResponse = Self::read_json(resp).await?;
        info!(total = body.total_results, returned = body.papers.len(), "search complete");
        Ok(body)
    }

    async fn related(&self, paper_id: &str, k: u32) -> Result<Vec<RelatedPaper>, ServiceError> {
        let url = self.url("/api/related");
        info!(url = %url, paper_id, k, "fetching related papers");
        let payload = RelatedRequest {
            paper_id: paper_id.to_string(),
            k,
        };
        let resp = self.client.post(&url).json(&payload).send().await?;
        let body: RelatedResponse = Self::read_json(resp).await?;
        Ok(body.into_papers())
    }

    async fn ask(&self, question: &str, paper_ids: &[String]) -> Result<String, ServiceError> {
        let url = self.url("/api/qa");
        info!(url = %url, papers = paper_ids.len(), "asking question");
        let payload = QaRequest {
            question: question.to_string(),
            paper_ids: paper_ids.to_vec(),
        };
        let resp = self.client.post(&url).json(&payload).send().await?;
        let body: QaAnswer = Self::read_json(resp).await?;
        Ok(body.answer)
    }
}

#[async_trait]
impl ExportService for HttpService {
    async fn export(
        &self,
        format: ExportFormat,
        query: &FilterSet,
        results: &SearchResponse,
    ) -> Result<Vec<u8>, ServiceError> {
        let url = self.url("/api/export");
        info!(url = %url, %format, papers = results.papers.len(), "exporting results");
        let payload = ExportRequest {
            format,
            query,
            results,
        };
        let resp = self.client.post(&url).json(&payload).send().await?;
        Self::read_bytes(resp).await
    }
}
