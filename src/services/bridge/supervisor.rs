//! Positioning session supervisor
//!
//! Single owner of the positioning SDK session. Initialization failures
//! are retried on a fixed delay, indefinitely: transient configuration
//! failures must self-heal without user action. A failure of an
//! established session re-enters the same loop; before re-subscribing,
//! stale watch handles are cleared so a recovered session never receives
//! duplicate callbacks.

use crate::domain::types::AppEvent;
use crate::infra::metrics::Metrics;
use crate::io::positioning::{PositioningConfig, PositioningSdk, SessionFailure, WatchId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing::{info, warn};

/// Fixed re-initialization delay. No backoff, no retry limit.
pub const INIT_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct PositioningSupervisor {
    sdk: Arc<dyn PositioningSdk>,
    config: PositioningConfig,
    events_tx: mpsc::Sender<AppEvent>,
    failure_rx: mpsc::Receiver<SessionFailure>,
    metrics: Arc<Metrics>,
    position_watch: Option<WatchId>,
    region_watch: Option<WatchId>,
}

impl PositioningSupervisor {
    pub fn new(
        sdk: Arc<dyn PositioningSdk>,
        config: PositioningConfig,
        events_tx: mpsc::Sender<AppEvent>,
        failure_rx: mpsc::Receiver<SessionFailure>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            sdk,
            config,
            events_tx,
            failure_rx,
            metrics,
            position_watch: None,
            region_watch: None,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if let Err(e) = self.sdk.initialize(&self.config).await {
                warn!(error = %e, delay_secs = INIT_RETRY_DELAY.as_secs(), "positioning_init_failed_retrying");
                self.metrics.record_init_retry();
                if wait_retry(&mut shutdown).await {
                    return;
                }
                continue;
            }
            info!("positioning_configured");

            if let Err(e) = self.start_watches().await {
                warn!(error = %e, "positioning_watch_failed_retrying");
                self.metrics.record_init_retry();
                if wait_retry(&mut shutdown).await {
                    return;
                }
                continue;
            }

            let _ = self.events_tx.send(AppEvent::PositioningStarted).await;

            // session established; wait for a failure or shutdown
            tokio::select! {
                failure = self.failure_rx.recv() => {
                    match failure {
                        Some(failure) => {
                            warn!(reason = %failure.reason, "positioning_session_failed");
                            self.metrics.record_init_retry();
                            if wait_retry(&mut shutdown).await {
                                return;
                            }
                        }
                        None => return, // SDK side gone
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("positioning_supervisor_shutdown");
                        return;
                    }
                }
            }
        }
    }

    /// Subscribe to all SDK streams, clearing stale handles first
    async fn start_watches(&mut self) -> anyhow::Result<()> {
        if let Some(id) = self.position_watch.take() {
            self.sdk.clear_watch(id).await;
        }
        self.position_watch = Some(self.sdk.watch_position(self.events_tx.clone()).await?);

        if let Some(id) = self.region_watch.take() {
            self.sdk.clear_region_watch(id).await;
        }
        self.region_watch = Some(self.sdk.watch_region(self.events_tx.clone()).await?);

        self.sdk.watch_heading(self.events_tx.clone()).await?;
        self.sdk.watch_status(self.events_tx.clone()).await?;
        Ok(())
    }
}

/// Sleep out the retry delay; returns true when shutdown was signalled
async fn wait_retry(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(INIT_RETRY_DELAY) => false,
        _ = shutdown.changed() => *shutdown.borrow(),
    }
}
