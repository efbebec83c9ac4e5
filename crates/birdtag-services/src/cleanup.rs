use birdtag_core::AppError;
use birdtag_db::TransientResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Periodically purges expired upload-match results
#[derive(Clone)]
pub struct TransientResultCleanup {
    results: Arc<dyn TransientResultStore>,
    period: Duration,
}

impl TransientResultCleanup {
    pub fn new(results: Arc<dyn TransientResultStore>, period: Duration) -> Self {
        Self { results, period }
    }

    /// Start the background purge loop
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(self.period);

            loop {
                cleanup_interval.tick().await;

                if let Err(e) = self.purge_once().await {
                    tracing::error!(error = %e, "Transient result cleanup failed");
                }
            }
        })
    }

    #[tracing::instrument(skip(self), fields(cleanup.operation = "purge_transient_results"))]
    pub async fn purge_once(&self) -> Result<u64, AppError> {
        let purged = self.results.purge_expired().await?;
        if purged > 0 {
            tracing::info!(purged, "Expired upload-match results purged");
        }
        Ok(purged)
    }
}
