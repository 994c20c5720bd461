//! Export coordination: per-format in-flight and recently-exported indicators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use litreview_core::{ExportFormat, FilterSet, SearchResponse};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::service::{ExportService, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    /// How long a format stays marked as exported.
    pub indicator_ttl: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            indicator_ttl: Duration::from_millis(3000),
        }
    }
}

/// A rendered export ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `litreview-results-<unix millis>.<ext>`
pub fn export_filename(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "litreview-results-{}.{}",
        at.timestamp_millis(),
        format.extension()
    )
}

struct Expiry {
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct ExportState {
    exporting: HashSet<ExportFormat>,
    exported: HashMap<ExportFormat, Expiry>,
}

fn lock(state: &Mutex<ExportState>) -> MutexGuard<'_, ExportState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag even if the export future is dropped.
struct InFlight<'a> {
    state: &'a Mutex<ExportState>,
    format: ExportFormat,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).exporting.remove(&self.format);
    }
}

pub struct ExportCoordinator<S> {
    service: Arc<S>,
    config: ExportConfig,
    state: Arc<Mutex<ExportState>>,
    generation: AtomicU64,
}

impl<S: ExportService> ExportCoordinator<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self::with_config(service, ExportConfig::default())
    }

    pub fn with_config(service: Arc<S>, config: ExportConfig) -> Self {
        Self {
            service,
            config,
            state: Arc::new(Mutex::new(ExportState::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// Render `results` in `format`. On success the format is marked exported
    /// for the indicator TTL; a repeat export restarts that timer.
    pub async fn export(
        &self,
        format: ExportFormat,
        query: &FilterSet,
        results: &SearchResponse,
    ) -> Result<ExportedFile, ServiceError> {
        lock(&self.state).exporting.insert(format);
        let in_flight = InFlight {
            state: &self.state,
            format,
        };
        let outcome = self.service.export(format, query, results).await;
        drop(in_flight);

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%format, error = %e, "export failed");
                return Err(e);
            }
        };
        let filename = export_filename(format, Utc::now());
        info!(%format, filename = %filename, bytes = bytes.len(), "export ready");
        self.mark_exported(format);
        Ok(ExportedFile {
            format,
            filename,
            bytes,
        })
    }

    pub fn is_exporting(&self, format: ExportFormat) -> bool {
        lock(&self.state).exporting.contains(&format)
    }

    pub fn is_exported(&self, format: ExportFormat) -> bool {
        lock(&self.state).exported.contains_key(&format)
    }

    fn mark_exported(&self, format: ExportFormat) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let state = Arc::clone(&self.state);
        let ttl = self.config.indicator_ttl;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = lock(&state);
            if state
                .exported
                .get(&format)
                .is_some_and(|e| e.generation == generation)
            {
                state.exported.remove(&format);
                debug!(%format, "export indicator expired");
            }
        });
        let previous = lock(&self.state)
            .exported
            .insert(format, Expiry { generation, timer });
        if let Some(previous) = previous {
            previous.timer.abort();
        }
    }
}

impl<S> Drop for ExportCoordinator<S> {
    fn drop(&mut self) {
        for (_, expiry) in lock(&self.state).exported.drain() {
            expiry.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedExport, response};
    use chrono::TimeZone;

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn filename_uses_millis_and_extension() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            export_filename(ExportFormat::Bibtex, at),
            "litreview-results-1700000000123.bib"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn indicator_clears_after_ttl() {
        let coord = ExportCoordinator::new(Arc::new(ScriptedExport::new()));
        let file = coord
            .export(ExportFormat::Csv, &FilterSet::new(), &response("fasting"))
            .await
            .unwrap();
        assert_eq!(file.bytes, b"csv:1");
        assert!(file.filename.ends_with(".csv"));
        assert!(coord.is_exported(ExportFormat::Csv));
        assert!(!coord.is_exported(ExportFormat::Json));

        advance(2999).await;
        assert!(coord.is_exported(ExportFormat::Csv));
        advance(2).await;
        assert!(!coord.is_exported(ExportFormat::Csv));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_export_restarts_timer() {
        let coord = ExportCoordinator::new(Arc::new(ScriptedExport::new()));
        let query = FilterSet::new();
        let results = response("fasting");

        coord.export(ExportFormat::Json, &query, &results).await.unwrap();
        advance(2000).await;
        coord.export(ExportFormat::Json, &query, &results).await.unwrap();

        advance(1500).await;
        assert!(coord.is_exported(ExportFormat::Json));
        advance(1600).await;
        assert!(!coord.is_exported(ExportFormat::Json));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_flag_tracks_request() {
        let service = Arc::new(ScriptedExport::new().with_latency(Duration::from_millis(1000)));
        let coord = Arc::new(ExportCoordinator::new(Arc::clone(&service)));

        let task = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move {
                coord
                    .export(ExportFormat::Ris, &FilterSet::new(), &response("fasting"))
                    .await
            }
        });
        advance(500).await;
        assert!(coord.is_exporting(ExportFormat::Ris));
        assert!(!coord.is_exporting(ExportFormat::Pdf));

        task.await.unwrap().unwrap();
        assert!(!coord.is_exporting(ExportFormat::Ris));
        assert!(coord.is_exported(ExportFormat::Ris));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_export_is_not_marked() {
        let service = Arc::new(ScriptedExport::new());
        service.fail(true);
        let coord = ExportCoordinator::new(Arc::clone(&service));

        let err = coord
            .export(ExportFormat::Pdf, &FilterSet::new(), &response("fasting"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Remote { status: 500, .. }));
        assert!(!coord.is_exporting(ExportFormat::Pdf));
        assert!(!coord.is_exported(ExportFormat::Pdf));
    }
}
