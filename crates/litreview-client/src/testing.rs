//! Scripted in-memory services for controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use litreview_core::{
    ArtifactKind, ExportFormat, FilterSet, Job, JobFilters, JobStatus, Paper, RelatedPaper,
    RunRequest, SearchRequest, SearchResponse,
};
use tokio::time::Instant;

use crate::service::{ExportService, JobService, SearchService, ServiceError};

pub(crate) fn job(id: &str, status: JobStatus) -> Job {
    Job {
        job_id: id.to_string(),
        topic: "intermittent fasting".to_string(),
        created_at: "2025-03-01T10:00:00".to_string(),
        filters: JobFilters::default(),
        status,
        markdown_path: None,
        json_path: None,
        csv_path: None,
        message: None,
    }
}

pub(crate) fn response(query: &str) -> SearchResponse {
    SearchResponse {
        query: query.to_string(),
        mode: "hybrid".to_string(),
        total_results: 1,
        papers: vec![Paper {
            id: format!("paper-{query}"),
            title: format!("On {query}"),
            abstract_text: None,
            authors: vec![],
            year: Some(2021),
            venue: None,
            doi: None,
            url: None,
            pdf_url: None,
            source: Some("openalex".to_string()),
            citations_count: None,
            extra: Default::default(),
        }],
    }
}

pub(crate) enum Step {
    Status(JobStatus),
    NetworkError,
    RemoteError,
}

/// Answers job polls from a script; an exhausted script keeps reporting `running`.
pub(crate) struct ScriptedJobs {
    script: Mutex<VecDeque<Step>>,
    polls: Mutex<Vec<Instant>>,
    latency: Duration,
    submit_network_failures: AtomicUsize,
    submit_rejected: AtomicBool,
    submits: AtomicUsize,
}

impl ScriptedJobs {
    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            polls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            submit_network_failures: AtomicUsize::new(0),
            submit_rejected: AtomicBool::new(false),
            submits: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn failing_submits(self, network_failures: usize) -> Self {
        self.submit_network_failures.store(network_failures, Ordering::SeqCst);
        self
    }

    pub(crate) fn rejecting_submits(self) -> Self {
        self.submit_rejected.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn poll_times(&self) -> Vec<Instant> {
        self.polls.lock().unwrap().clone()
    }

    pub(crate) fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobService for ScriptedJobs {
    async fn run_job(&self, _request: &RunRequest) -> Result<Job, ServiceError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.submit_rejected.load(Ordering::SeqCst) {
            return Err(ServiceError::Remote { status: 422, body: "bad topic".into() });
        }
        let pending = self.submit_network_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.submit_network_failures.store(pending - 1, Ordering::SeqCst);
            return Err(ServiceError::Unreachable("connection reset".into()));
        }
        Ok(job("job-1", JobStatus::Running))
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        Ok(vec![job("job-1", JobStatus::Running)])
    }

    async fn job_result(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.polls.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Status(status)) => Ok(job(job_id, status)),
            Some(Step::NetworkError) => Err(ServiceError::Unreachable("timed out".into())),
            Some(Step::RemoteError) => Err(ServiceError::Remote {
                status: 404,
                body: "Job not found".into(),
            }),
            None => Ok(job(job_id, JobStatus::Running)),
        }
    }

    async fn download(&self, _job_id: &str, _kind: ArtifactKind) -> Result<Vec<u8>, ServiceError> {
        Ok(b"# report".to_vec())
    }
}

/// Answers searches with one paper named after the query, after a per-query delay.
#[derive(Default)]
pub(crate) struct ScriptedSearch {
    latency: Mutex<HashMap<String, Duration>>,
    network_failures: AtomicUsize,
    remote_failure: AtomicBool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn delay(self, query: &str, latency: Duration) -> Self {
        self.latency.lock().unwrap().insert(query.to_string(), latency);
        self
    }

    pub(crate) fn fail_network(&self, times: usize) {
        self.network_failures.store(times, Ordering::SeqCst);
    }

    pub(crate) fn fail_remote(&self, on: bool) {
        self.remote_failure.store(on, Ordering::SeqCst);
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchService for ScriptedSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        self.queries.lock().unwrap().push(request.q.clone());
        let latency = self.latency.lock().unwrap().get(&request.q).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let pending = self.network_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.network_failures.store(pending - 1, Ordering::SeqCst);
            return Err(ServiceError::Unreachable("connection refused".into()));
        }
        if self.remote_failure.load(Ordering::SeqCst) {
            return Err(ServiceError::Remote { status: 500, body: "index offline".into() });
        }
        Ok(response(&request.q))
    }

    async fn related(&self, paper_id: &str, k: u32) -> Result<Vec<RelatedPaper>, ServiceError> {
        Ok((0..k.min(2))
            .map(|i| RelatedPaper {
                id: format!("{paper_id}-rel-{i}"),
                title: format!("Related {i}"),
                year: None,
                venue: None,
                url: None,
                doi: None,
            })
            .collect())
    }

    async fn ask(&self, question: &str, paper_ids: &[String]) -> Result<String, ServiceError> {
        Ok(format!("{question} ({} papers)", paper_ids.len()))
    }
}

/// Renders exports as `<format>:<paper count>` after an optional delay.
#[derive(Default)]
pub(crate) struct ScriptedExport {
    latency: Duration,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedExport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn fail(&self, on: bool) {
        self.fail.store(on, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportService for ScriptedExport {
    async fn export(
        &self,
        format: ExportFormat,
        _query: &FilterSet,
        results: &SearchResponse,
    ) -> Result<Vec<u8>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Remote { status: 500, body: "renderer crashed".into() });
        }
        Ok(format!("{format}:{}", results.papers.len()).into_bytes())
    }
}
