//! Request lifecycle controller for the literature-review service.
//!
//! Three independent channels talk to the service: the job channel polls
//! long-running review jobs, the search channel orders interactive searches by
//! nonce, and the export coordinator tracks per-format export indicators.

pub mod export;
#[cfg(feature = "http")]
pub mod http;
pub mod jobs;
pub mod search;
pub mod service;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use export::{ExportConfig, ExportCoordinator, ExportedFile, export_filename};
#[cfg(feature = "http")]
pub use http::HttpService;
pub use jobs::{JobPoller, JobSnapshot, PollConfig, PollHandle};
pub use search::{Delivery, LoadState, Nonce, SearchChannel, SearchFailure, SearchSnapshot};
pub use service::{
    ExportService, FailureKind, JobService, SearchService, ServiceError, retry_transient,
};
pub use workspace::ReviewWorkspace;
