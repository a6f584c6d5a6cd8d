//! Wayfinding route model

use crate::domain::types::{FloorNumber, LatLng};
use smallvec::SmallVec;
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) navigation session id
pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// One point along a route, pinned to a floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: LatLng,
    pub floor: FloorNumber,
}

/// A segment of a route between two waypoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub begin: Waypoint,
    pub end: Waypoint,
}

/// A wayfinding route as delivered by the positioning service.
///
/// Owned transiently by the wayfinding controller for one navigation
/// session; `finished` is set by the service when the destination is
/// reached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub legs: SmallVec<[RouteLeg; 8]>,
    pub finished: bool,
}

impl Route {
    /// Polyline points for the legs touching `floor`.
    ///
    /// A leg is drawn when either endpoint lies on the displayed floor, so
    /// floor-transition legs (stairs, elevators) stay visible from both
    /// sides. Consecutive legs share endpoints; the shared point is emitted
    /// once.
    pub fn points_on_floor(&self, floor: FloorNumber) -> Vec<LatLng> {
        let mut points = Vec::new();
        let mut last: Option<LatLng> = None;
        for leg in &self.legs {
            if leg.begin.floor != floor && leg.end.floor != floor {
                last = None;
                continue;
            }
            if last != Some(leg.begin.position) {
                points.push(leg.begin.position);
            }
            points.push(leg.end.position);
            last = Some(leg.end.position);
        }
        points
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}
