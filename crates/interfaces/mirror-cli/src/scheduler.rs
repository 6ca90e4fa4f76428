use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use humansize::{format_size, DECIMAL};
use mirror_pipeline::{SyncEngine, SyncError, SyncRequest, SyncSummary};
use tracing::{error, info};

/// Drives passes forever: run one, sleep for the interval, repeat.
///
/// A failed pass is logged and the next one is still scheduled. Shutdown is
/// only honoured between passes.
pub struct Scheduler {
    engine: Arc<SyncEngine>,
    request: SyncRequest,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, request: SyncRequest, interval: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            request,
            interval,
        }
    }

    /// One pass on the blocking pool.
    pub async fn run_pass(&self) -> Result<SyncSummary, SyncError> {
        let engine = Arc::clone(&self.engine);
        let request = self.request.clone();
        tokio::task::spawn_blocking(move || engine.run_once(&request))
            .await
            .unwrap_or_else(|e| Err(SyncError::WorkerPool(format!("pass aborted: {e}"))))
    }

    /// Loop until `shutdown` resolves. Returns the number of passes run.
    pub async fn run<F>(self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut passes = 0u64;
        let mut stopping = false;

        loop {
            let pass = self.run_pass();
            tokio::pin!(pass);
            let outcome = loop {
                tokio::select! {
                    biased;
                    outcome = &mut pass => break outcome,
                    _ = &mut shutdown, if !stopping => {
                        info!("Shutdown requested, finishing the current pass");
                        stopping = true;
                    }
                }
            };
            passes += 1;
            report(passes, &outcome);

            if stopping {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Stopped after {} passes", passes);
        passes
    }
}

fn report(pass: u64, outcome: &Result<SyncSummary, SyncError>) {
    match outcome {
        Ok(summary) if summary.is_clean() => info!(
            "Pass {} complete: {} copied in {:.2?}",
            pass,
            format_size(summary.bytes_copied, DECIMAL),
            summary.elapsed
        ),
        Ok(summary) => info!(
            "Pass {} complete with {} errors: {} copied in {:.2?}",
            pass,
            summary.error_count(),
            format_size(summary.bytes_copied, DECIMAL),
            summary.elapsed
        ),
        Err(e) => error!("Pass {} failed: {}", pass, e),
    }
}
