//! Positioning/region bridge - central event orchestration
//!
//! The Bridge is the single consumer of the fan-in event channel. It
//! coordinates:
//! - Blue-dot rendering (map view adapter)
//! - Floor overlay selection and floor-change re-sync
//! - Wayfinding sessions (tap to destination, route updates, arrival)
//! - Beacon proximity notifications
//!
//! A separate supervisor task owns the positioning session lifecycle,
//! including the fixed-delay initialization retry.

mod handlers;
mod supervisor;
#[cfg(test)]
mod tests;

pub use supervisor::{PositioningSupervisor, INIT_RETRY_DELAY};

use crate::domain::types::AppEvent;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::map::MapHandle;
use crate::io::notifications::Notifier;
use crate::io::positioning::PositioningSdk;
use crate::services::beacon_notifier::BeaconNotifier;
use crate::services::floor_plan::FloorPlanSelector;
use crate::services::map_view::MapViewAdapter;
use crate::services::wayfinding::WayfindingController;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::info;

/// Central event processor wiring SDK callbacks to map mutations
pub struct Bridge {
    /// Blue-dot and accuracy-circle rendering
    pub(crate) map_view: MapViewAdapter,
    /// Active floor plan / venue overlay
    pub(crate) floor_plans: FloorPlanSelector,
    /// Route drawing and navigation session state
    pub(crate) wayfinding: WayfindingController,
    /// Edge-triggered beacon notifications
    pub(crate) beacons: BeaconNotifier,
    /// Positioning SDK handle for wayfinding requests
    pub(crate) sdk: Arc<dyn PositioningSdk>,
    /// Sender handed to the SDK for wayfinding update callbacks
    pub(crate) events_tx: mpsc::Sender<AppEvent>,
    /// Map surface command channel
    pub(crate) map: MapHandle,
    /// Metrics collector
    pub(crate) metrics: Arc<Metrics>,
    /// Map taps route to wayfinding only after positioning is up
    pub(crate) positioning_started: bool,
    /// Terminal service status was reported
    pub(crate) out_of_service: bool,
    metrics_interval_secs: u64,
}

impl Bridge {
    pub fn new(
        config: &Config,
        sdk: Arc<dyn PositioningSdk>,
        map: MapHandle,
        notifier: Box<dyn Notifier>,
        metrics: Arc<Metrics>,
        events_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            map_view: MapViewAdapter::new(map.clone(), config.first_fix_zoom()),
            floor_plans: FloorPlanSelector::new(map.clone()),
            wayfinding: WayfindingController::new(map.clone()),
            beacons: BeaconNotifier::new(config.beacons(), notifier, metrics.clone()),
            sdk,
            events_tx,
            map,
            metrics,
            positioning_started: false,
            out_of_service: false,
            metrics_interval_secs: config.metrics_interval_secs(),
        }
    }

    /// Start the bridge, consuming events from the channel
    pub async fn run(
        &mut self,
        mut event_rx: mpsc::Receiver<AppEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut tick_interval = interval(Duration::from_secs(self.metrics_interval_secs));
        // the first tick completes immediately
        tick_interval.tick().await;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(e) => self.process_event(e).await,
                        None => break, // channel closed
                    }
                }
                _ = tick_interval.tick() => {
                    self.metrics.report().log();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("bridge_shutdown");
                        break;
                    }
                }
            }
        }
    }

    /// Process a single event, dispatching to the appropriate handler
    pub async fn process_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Position(position) => {
                self.metrics.record_position();
                self.handle_position(&position);
            }
            AppEvent::EnterRegion(region) => {
                self.metrics.record_region_event();
                self.handle_enter_region(region);
            }
            AppEvent::ExitRegion(region) => {
                self.metrics.record_region_event();
                self.handle_exit_region(&region);
            }
            AppEvent::Heading(degrees) => {
                self.map_view.on_heading_changed(degrees);
            }
            AppEvent::RouteUpdate(route) => {
                self.handle_route_update(route).await;
            }
            AppEvent::Status { status, message } => {
                self.handle_status(status, &message);
            }
            AppEvent::PositioningStarted => {
                self.handle_positioning_started();
            }
            AppEvent::MapTap(at) => {
                self.handle_map_tap(at).await;
            }
            AppEvent::ZoomStart => {
                self.map_view.on_zoom_start();
            }
            AppEvent::ZoomEnd => {
                self.map_view.on_zoom_end(self.floor_plans.floor_number());
            }
            AppEvent::BeaconRanged(ranging) => {
                self.metrics.record_beacon_event();
                self.beacons.on_beacons_ranged(ranging);
            }
            AppEvent::NotificationClick(id) => {
                self.beacons.on_notification_click(id);
            }
        }

        self.metrics.record_event_processed();
    }

    /// A terminal service status has been reported
    pub fn is_out_of_service(&self) -> bool {
        self.out_of_service
    }
}
