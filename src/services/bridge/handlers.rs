//! Event handlers for the Bridge
//!
//! Each handler forwards one SDK stream into the owning component and
//! performs the cross-component re-sync that stream implies (floor
//! changes re-draw the dot and the route, finished routes tear down the
//! wayfinding subscription).

use super::Bridge;
use crate::domain::route::Route;
use crate::domain::types::{LatLng, Position, Region, ServiceStatus};
use crate::io::map::MapCommand;
use crate::io::positioning::WayfindingDestination;
use crate::services::floor_plan::FloorChange;
use tracing::{debug, error, info, warn};

impl Bridge {
    pub(crate) fn handle_position(&mut self, position: &Position) {
        self.map_view.on_location_changed(position, self.floor_plans.floor_number());
    }

    pub(crate) fn handle_enter_region(&mut self, region: Region) {
        debug!(kind = region.kind(), id = region.id(), "region_entered");
        let change = match region {
            Region::FloorPlan(plan) => self.floor_plans.on_enter_floor_plan(plan),
            Region::Venue(venue) => {
                self.floor_plans.on_enter_venue(venue);
                None
            }
        };
        if let Some(change) = change {
            self.on_floor_change(change);
        }
    }

    pub(crate) fn handle_exit_region(&mut self, region: &Region) {
        debug!(kind = region.kind(), id = region.id(), "region_exited");
        let change = match region {
            Region::FloorPlan(_) => self.floor_plans.on_exit_floor_plan(),
            Region::Venue(_) => {
                self.floor_plans.on_exit_venue();
                None
            }
        };
        if let Some(change) = change {
            self.on_floor_change(change);
        }
    }

    /// Re-sync dependent components after the displayed floor changed
    fn on_floor_change(&mut self, change: FloorChange) {
        info!(from = ?change.from, to = ?change.to, "floor_changed");
        self.map_view.refresh(change.to);
        self.wayfinding.set_current_floor(change.to);
    }

    pub(crate) fn handle_positioning_started(&mut self) {
        self.positioning_started = true;
        self.wayfinding.set_current_floor(self.floor_plans.floor_number());
        info!("positioning_started");
    }

    /// A map tap requests wayfinding to the tapped point on the displayed floor
    pub(crate) async fn handle_map_tap(&mut self, at: LatLng) {
        if !self.positioning_started {
            debug!("map_tap_ignored_not_started");
            return;
        }
        let Some(floor) = self.floor_plans.floor_number() else {
            debug!("map_tap_ignored_no_floor");
            return;
        };

        let destination = WayfindingDestination { latitude: at.lat, longitude: at.lng, floor };
        self.wayfinding.start(&destination);
        self.metrics.record_wayfinding_request();

        // no retry: a failed request waits for the user's next tap
        if let Err(e) = self
            .sdk
            .request_wayfinding_updates(destination, self.events_tx.clone())
            .await
        {
            warn!(error = %e, "wayfinding_request_failed");
        }
    }

    pub(crate) async fn handle_route_update(&mut self, route: Route) {
        self.wayfinding.update_route(route);
        if self.wayfinding.route_finished() {
            info!("wayfinding_finished");
            self.wayfinding.hide_route();
            self.sdk.remove_wayfinding_updates().await;
            self.metrics.record_route_completed();
        }
    }

    pub(crate) fn handle_status(&mut self, status: ServiceStatus, message: &str) {
        info!(status = status.as_str(), message = %message, "positioning_status");
        if status == ServiceStatus::OutOfService {
            self.out_of_service = true;
            error!(message = %message, "positioning_out_of_service");
            self.map.send(MapCommand::Alert {
                message: format!("Unrecoverable positioning error: {message}"),
            });
        }
    }
}
