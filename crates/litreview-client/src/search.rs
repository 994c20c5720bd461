//! Search channel: nonce-ordered interactive searches.
//!
//! Every issued search takes a fresh, strictly increasing nonce. A response is
//! applied only if its nonce is still the latest issued one, so a slow early
//! request can never overwrite the result of a later one. Superseded requests
//! are left to finish; their responses are dropped when they arrive.

use std::fmt;
use std::sync::Arc;

use litreview_core::{SearchRequest, SearchResponse, SubmitMode};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::service::{FailureKind, SearchService, ServiceError, retry_transient};

/// Issue order of a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nonce(u64);

impl Nonce {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    /// Blocking load; nothing useful to show yet.
    Loading,
    /// Background refresh; the previous result stays visible.
    Refreshing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub nonce: Nonce,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    /// Most recently issued nonce.
    pub latest: Nonce,
    /// Nonce whose response produced `result`.
    pub applied: Option<Nonce>,
    /// Last successfully applied response.
    pub result: Option<SearchResponse>,
    /// Failure of the latest search, if it failed.
    pub error: Option<SearchFailure>,
    pub load: LoadState,
}

impl Default for SearchSnapshot {
    fn default() -> Self {
        Self {
            latest: Nonce::default(),
            applied: None,
            result: None,
            error: None,
            load: LoadState::Idle,
        }
    }
}

/// What happened to a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    Failed,
    /// A newer search was issued first; the response was discarded.
    Stale,
}

pub struct SearchChannel<S> {
    service: Arc<S>,
    state: Arc<watch::Sender<SearchSnapshot>>,
}

impl<S> Clone for SearchChannel<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: SearchService> SearchChannel<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: Arc::new(watch::Sender::new(SearchSnapshot::default())),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.subscribe()
    }

    /// Issue a nonce for a new search and mark the channel busy.
    pub fn begin(&self, mode: SubmitMode) -> Nonce {
        let mut issued = Nonce::default();
        self.state.send_modify(|s| {
            s.latest = s.latest.next();
            issued = s.latest;
            s.load = match mode {
                SubmitMode::Background if s.result.is_some() => LoadState::Refreshing,
                _ => LoadState::Loading,
            };
        });
        debug!(nonce = %issued, ?mode, "search issued");
        issued
    }

    /// Deliver the outcome of the search issued as `nonce`.
    ///
    /// A failure replaces the error but keeps the last good result.
    pub fn complete(
        &self,
        nonce: Nonce,
        outcome: Result<SearchResponse, ServiceError>,
    ) -> Delivery {
        let mut delivery = Delivery::Stale;
        let mut failure_message = None;
        self.state.send_if_modified(|s| {
            if s.latest != nonce {
                return false;
            }
            match outcome {
                Ok(response) => {
                    s.applied = Some(nonce);
                    s.result = Some(response);
                    s.error = None;
                    delivery = Delivery::Applied;
                }
                Err(e) => {
                    let message = e.to_string();
                    s.error = Some(SearchFailure {
                        nonce,
                        kind: e.kind(),
                        message: message.clone(),
                    });
                    failure_message = Some(message);
                    delivery = Delivery::Failed;
                }
            }
            s.load = LoadState::Idle;
            true
        });
        match (delivery, failure_message) {
            (Delivery::Stale, _) => debug!(nonce = %nonce, "discarding superseded search response"),
            (Delivery::Failed, Some(error)) => warn!(nonce = %nonce, %error, "search failed"),
            _ => {}
        }
        delivery
    }

    /// Run the search issued as `nonce`, retrying once without a response.
    pub async fn resolve(&self, nonce: Nonce, request: &SearchRequest) -> Delivery {
        let outcome = retry_transient("search", || self.service.search(request)).await;
        self.complete(nonce, outcome)
    }

    pub async fn submit(&self, request: &SearchRequest, mode: SubmitMode) -> Delivery {
        let nonce = self.begin(mode);
        self.resolve(nonce, request).await
    }
}
