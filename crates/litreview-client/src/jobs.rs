//! Job channel: submit a review job, then poll it until it settles.
//!
//! Each submission or watch owns one polling task. The task publishes every
//! observation through a `watch` channel and stops on a terminal status, a
//! remote failure, or cancellation. After cancellation nothing further is
//! published, including the response of a poll that was already in flight.

use std::sync::Arc;
use std::time::Duration;

use litreview_core::{Job, JobPhase, RunRequest};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::{JobService, retry_transient};

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between polls while the job is running.
    pub running_interval: Duration,
    /// Delay before the next poll after a poll got no response.
    pub retry_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            running_interval: Duration::from_millis(3000),
            retry_interval: Duration::from_millis(5000),
        }
    }
}

/// What the client currently knows about one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    /// Unknown until the submission is acknowledged.
    pub job_id: Option<String>,
    pub phase: JobPhase,
    /// Last record returned by the service.
    pub job: Option<Job>,
    pub last_error: Option<String>,
    /// Poll attempts whose outcome was published.
    pub polls: u32,
    /// Polling ended without a terminal status.
    pub stopped: bool,
}

impl JobSnapshot {
    fn submitted() -> Self {
        Self {
            job_id: None,
            phase: JobPhase::Submitted,
            job: None,
            last_error: None,
            polls: 0,
            stopped: false,
        }
    }

    fn watching(job_id: String) -> Self {
        Self {
            job_id: Some(job_id),
            phase: JobPhase::Running,
            ..Self::submitted()
        }
    }

    /// No further updates will arrive.
    pub fn is_settled(&self) -> bool {
        self.phase.is_terminal() || self.stopped
    }
}

/// Spawns polling tasks against a [`JobService`].
pub struct JobPoller<S> {
    service: Arc<S>,
    config: PollConfig,
}

impl<S: JobService + 'static> JobPoller<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self::with_config(service, PollConfig::default())
    }

    pub fn with_config(service: Arc<S>, config: PollConfig) -> Self {
        Self { service, config }
    }

    /// Submit a new job and poll it once the service acknowledges it.
    pub fn submit(&self, request: RunRequest) -> PollHandle {
        let state = Arc::new(watch::Sender::new(JobSnapshot::submitted()));
        let token = CancellationToken::new();
        let task = tokio::spawn(submit_then_poll(
            Arc::clone(&self.service),
            self.config,
            Arc::clone(&state),
            token.clone(),
            request,
        ));
        PollHandle { state, token, task }
    }

    /// Poll an existing job. Starting a new watch is also how a stopped
    /// channel is retried.
    pub fn watch(&self, job_id: impl Into<String>) -> PollHandle {
        let job_id = job_id.into();
        let state = Arc::new(watch::Sender::new(JobSnapshot::watching(job_id.clone())));
        let token = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.service),
            self.config,
            Arc::clone(&state),
            token.clone(),
            job_id,
        ));
        PollHandle { state, token, task }
    }
}

/// Owner of one polling task. Dropping the handle cancels the task.
pub struct PollHandle {
    state: Arc<watch::Sender<JobSnapshot>>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn snapshot(&self) -> JobSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.state.subscribe()
    }

    /// Stop polling. Any response still in flight is discarded.
    pub fn cancel(&self) {
        // Cancelling under the channel lock orders it against publication:
        // a publish either completed before this point or will see the token.
        self.state.send_if_modified(|_| {
            self.token.cancel();
            false
        });
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the job settles or the handle is cancelled.
    pub async fn settled(&self) -> JobSnapshot {
        let mut rx = self.subscribe();
        tokio::select! {
            _ = self.token.cancelled() => {}
            res = rx.wait_for(JobSnapshot::is_settled) => drop(res),
        }
        self.snapshot()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Apply `update` unless the channel was cancelled or the job already settled.
fn publish(
    state: &watch::Sender<JobSnapshot>,
    token: &CancellationToken,
    update: impl FnOnce(&mut JobSnapshot),
) -> bool {
    state.send_if_modified(|snapshot| {
        if token.is_cancelled() || snapshot.phase.is_terminal() {
            return false;
        }
        update(snapshot);
        true
    })
}

async fn submit_then_poll<S: JobService>(
    service: Arc<S>,
    config: PollConfig,
    state: Arc<watch::Sender<JobSnapshot>>,
    token: CancellationToken,
    request: RunRequest,
) {
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        res = retry_transient("run_job", || service.run_job(&request)) => res,
    };
    let job = match outcome {
        Ok(job) => job,
        Err(e) => {
            warn!(topic = %request.topic, error = %e, "job submission failed");
            publish(&state, &token, |s| {
                s.last_error = Some(e.to_string());
                s.stopped = true;
            });
            return;
        }
    };

    let job_id = job.job_id.clone();
    info!(job_id = %job_id, "job submitted");
    let accepted = publish(&state, &token, |s| {
        s.job_id = Some(job.job_id.clone());
        s.phase = JobPhase::Running;
        s.job = Some(job);
    });
    if accepted {
        poll_loop(service, config, state, token, job_id).await;
    }
}

async fn poll_loop<S: JobService>(
    service: Arc<S>,
    config: PollConfig,
    state: Arc<watch::Sender<JobSnapshot>>,
    token: CancellationToken,
    job_id: String,
) {
    loop {
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            res = service.job_result(&job_id) => res,
        };

        let delay = match outcome {
            Ok(job) => {
                let status = job.status;
                let published = publish(&state, &token, |s| {
                    s.polls += 1;
                    s.phase = s.phase.observe(status);
                    s.last_error = None;
                    s.job = Some(job);
                });
                if !published {
                    return;
                }
                let phase = state.borrow().phase;
                if phase.is_terminal() {
                    info!(job_id = %job_id, %phase, "job settled");
                    return;
                }
                debug!(job_id = %job_id, "job still running");
                config.running_interval
            }
            Err(e) if e.is_transient() => {
                warn!(job_id = %job_id, error = %e, "poll got no response, backing off");
                if !publish(&state, &token, |s| {
                    s.polls += 1;
                    s.last_error = Some(e.to_string());
                }) {
                    return;
                }
                config.retry_interval
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "poll rejected, stopping");
                publish(&state, &token, |s| {
                    s.polls += 1;
                    s.last_error = Some(e.to_string());
                    s.stopped = true;
                });
                return;
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
