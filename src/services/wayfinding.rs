//! Route drawing and the navigation session state machine
//!
//! One navigation session at a time: Idle until a destination is
//! requested, Navigating while route updates arrive, back to Idle when the
//! route finishes or is cleared. Rendering is restricted to the legs
//! touching the current floor.

use crate::domain::route::{new_session_id, Route};
use crate::domain::types::FloorNumber;
use crate::io::map::{MapCommand, MapHandle};
use crate::io::positioning::WayfindingDestination;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
enum NavState {
    Idle,
    Navigating { session_id: String },
}

pub struct WayfindingController {
    map: MapHandle,
    state: NavState,
    current_floor: Option<FloorNumber>,
    route: Option<Route>,
}

impl WayfindingController {
    pub fn new(map: MapHandle) -> Self {
        Self { map, state: NavState::Idle, current_floor: None, route: None }
    }

    pub fn is_navigating(&self) -> bool {
        matches!(self.state, NavState::Navigating { .. })
    }

    /// Begin a navigation session. Re-targeting while navigating keeps the
    /// session; the next route update redraws toward the new destination.
    pub fn start(&mut self, destination: &WayfindingDestination) {
        match &self.state {
            NavState::Idle => {
                let session_id = new_session_id();
                info!(
                    session = %session_id,
                    lat = %destination.latitude,
                    lng = %destination.longitude,
                    floor = %destination.floor,
                    "wayfinding_session_started"
                );
                self.state = NavState::Navigating { session_id };
            }
            NavState::Navigating { session_id } => {
                info!(
                    session = %session_id,
                    lat = %destination.latitude,
                    lng = %destination.longitude,
                    floor = %destination.floor,
                    "wayfinding_retargeted"
                );
            }
        }
    }

    /// Restrict rendering to `floor` and redraw the active route
    pub fn set_current_floor(&mut self, floor: Option<FloorNumber>) {
        self.current_floor = floor;
        self.redraw();
    }

    pub fn update_route(&mut self, route: Route) {
        if !self.is_navigating() {
            // updates can trail a cleared session; nothing to draw
            debug!("route_update_ignored_idle");
            return;
        }
        self.route = Some(route);
        self.redraw();
    }

    /// Whether the latest update reported arrival
    pub fn route_finished(&self) -> bool {
        self.is_navigating() && self.route.as_ref().is_some_and(|r| r.finished)
    }

    /// Clear the polyline and end the session
    pub fn hide_route(&mut self) {
        if let NavState::Navigating { session_id } = &self.state {
            info!(session = %session_id, "wayfinding_session_ended");
        }
        self.route = None;
        self.state = NavState::Idle;
        self.map.send(MapCommand::ClearRoute);
    }

    fn redraw(&self) {
        let points = match (&self.route, self.current_floor) {
            (Some(route), Some(floor)) => route.points_on_floor(floor),
            _ => Vec::new(),
        };
        if points.len() >= 2 {
            self.map.send(MapCommand::DrawRoute { points });
        } else {
            self.map.send(MapCommand::ClearRoute);
        }
    }
}
