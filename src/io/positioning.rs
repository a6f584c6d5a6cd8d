//! Positioning service seam and payload parsing
//!
//! The positioning SDK is an opaque capability behind the [`PositioningSdk`]
//! trait; implementations deliver their JSON callback payloads through the
//! parsers here into [`AppEvent`]s. Watch subscriptions hand back a
//! [`WatchId`] so a re-subscribe can clear the prior handle and avoid
//! duplicate callbacks.

use crate::domain::route::{Route, RouteLeg, Waypoint};
use crate::domain::types::{
    epoch_ms, AppEvent, FloorNumber, FloorPlan, LatLng, LatLngBounds, Position, Region,
    ServiceStatus, Venue,
};
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use smallvec::SmallVec;
use tokio::sync::mpsc;

/// Region type discriminator in SDK region payloads
pub const REGION_TYPE_FLOORPLAN: i32 = 1;
pub const REGION_TYPE_VENUE: i32 = 2;

/// Handle for an active watch subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct WatchId(pub u64);

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SDK session credentials
#[derive(Debug, Clone)]
pub struct PositioningConfig {
    pub api_key: String,
    pub api_secret: String,
}

/// Wayfinding destination forwarded from a map tap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayfindingDestination {
    pub latitude: f64,
    pub longitude: f64,
    pub floor: FloorNumber,
}

/// A failure of an established positioning session.
///
/// Sent by SDK implementations when an active watch errors; the supervisor
/// responds by tearing the session down and re-entering the retry loop.
#[derive(Debug, Clone)]
pub struct SessionFailure {
    pub reason: String,
}

/// Opaque positioning service capability.
///
/// Mirrors the native SDK surface: session initialization, position and
/// region watches, heading and status streams, and wayfinding updates.
#[async_trait]
pub trait PositioningSdk: Send + Sync {
    async fn initialize(&self, config: &PositioningConfig) -> anyhow::Result<()>;

    async fn watch_position(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId>;
    async fn clear_watch(&self, id: WatchId);

    async fn watch_region(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId>;
    async fn clear_region_watch(&self, id: WatchId);

    async fn watch_heading(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<()>;
    async fn watch_status(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<()>;

    async fn request_wayfinding_updates(
        &self,
        destination: WayfindingDestination,
        events: mpsc::Sender<AppEvent>,
    ) -> anyhow::Result<()>;
    async fn remove_wayfinding_updates(&self);
}

// --- SDK payload shapes ---

#[derive(Debug, Deserialize)]
struct PositionPayload {
    coords: CoordsPayload,
    #[serde(default)]
    timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CoordsPayload {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(default)]
    floor: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionPayload {
    region_type: i32,
    region_id: String,
    #[serde(default)]
    floor_plan: Option<FloorPlanPayload>,
    #[serde(default)]
    venue: Option<VenuePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloorPlanPayload {
    id: String,
    #[serde(default)]
    name: String,
    url: String,
    floor_level: i32,
    /// [lat, lng] corners of the overlay image
    bottom_left: [f64; 2],
    top_right: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct VenuePayload {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadingPayload {
    true_heading: f64,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RoutePayload {
    #[serde(default)]
    legs: Vec<RouteLegPayload>,
    #[serde(default)]
    finished: bool,
}

#[derive(Debug, Deserialize)]
struct RouteLegPayload {
    begin: RoutePointPayload,
    end: RoutePointPayload,
}

#[derive(Debug, Deserialize)]
struct RoutePointPayload {
    latitude: f64,
    longitude: f64,
    floor: i32,
}

// --- Parsers ---

/// Parse a position callback payload.
///
/// Missing coordinates are a payload-contract violation from the SDK, not
/// a runtime condition; the parse error carries the raw JSON for triage.
pub fn parse_position(raw: &serde_json::Value) -> anyhow::Result<Position> {
    let payload: PositionPayload =
        serde_json::from_value(raw.clone()).context("malformed position payload")?;
    Ok(Position {
        center: LatLng::new(payload.coords.latitude, payload.coords.longitude),
        accuracy_m: payload.coords.accuracy,
        floor: payload.coords.floor.map(FloorNumber),
        timestamp_ms: payload.timestamp.unwrap_or_else(epoch_ms),
    })
}

/// Parse a region enter/exit callback payload
pub fn parse_region(raw: &serde_json::Value) -> anyhow::Result<Region> {
    let payload: RegionPayload =
        serde_json::from_value(raw.clone()).context("malformed region payload")?;

    match payload.region_type {
        REGION_TYPE_FLOORPLAN => {
            let plan = payload
                .floor_plan
                .with_context(|| format!("floor plan region {} missing floorPlan", payload.region_id))?;
            Ok(Region::FloorPlan(FloorPlan {
                id: plan.id,
                name: plan.name,
                floor: FloorNumber(plan.floor_level),
                image_url: plan.url,
                bounds: LatLngBounds {
                    south_west: LatLng::new(plan.bottom_left[0], plan.bottom_left[1]),
                    north_east: LatLng::new(plan.top_right[0], plan.top_right[1]),
                },
            }))
        }
        REGION_TYPE_VENUE => {
            let venue = payload
                .venue
                .with_context(|| format!("venue region {} missing venue", payload.region_id))?;
            Ok(Region::Venue(Venue { id: venue.id, name: venue.name }))
        }
        other => bail!("unknown region type {other}"),
    }
}

/// Parse a heading callback payload into degrees
pub fn parse_heading(raw: &serde_json::Value) -> anyhow::Result<f64> {
    let payload: HeadingPayload =
        serde_json::from_value(raw.clone()).context("malformed heading payload")?;
    Ok(payload.true_heading)
}

/// Parse a status callback payload
pub fn parse_status(raw: &serde_json::Value) -> anyhow::Result<(ServiceStatus, String)> {
    let payload: StatusPayload =
        serde_json::from_value(raw.clone()).context("malformed status payload")?;
    Ok((ServiceStatus::from_code(payload.code), payload.message))
}

/// Parse a wayfinding route update payload
pub fn parse_route(raw: &serde_json::Value) -> anyhow::Result<Route> {
    let payload: RoutePayload =
        serde_json::from_value(raw.clone()).context("malformed route payload")?;

    let legs: SmallVec<[RouteLeg; 8]> = payload
        .legs
        .iter()
        .map(|leg| RouteLeg {
            begin: Waypoint {
                position: LatLng::new(leg.begin.latitude, leg.begin.longitude),
                floor: FloorNumber(leg.begin.floor),
            },
            end: Waypoint {
                position: LatLng::new(leg.end.latitude, leg.end.longitude),
                floor: FloorNumber(leg.end.floor),
            },
        })
        .collect();

    Ok(Route { legs, finished: payload.finished })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_position() {
        let raw = json!({
            "coords": { "latitude": 40.4138, "longitude": -3.6921, "accuracy": 2.5, "floor": 1 },
            "timestamp": 1722945600000u64
        });
        let pos = parse_position(&raw).unwrap();
        assert_eq!(pos.center, LatLng::new(40.4138, -3.6921));
        assert_eq!(pos.accuracy_m, 2.5);
        assert_eq!(pos.floor, Some(FloorNumber(1)));
        assert_eq!(pos.timestamp_ms, 1722945600000);
    }

    #[test]
    fn test_parse_position_without_floor() {
        let raw = json!({ "coords": { "latitude": 1.0, "longitude": 2.0, "accuracy": 10.0 } });
        let pos = parse_position(&raw).unwrap();
        assert_eq!(pos.floor, None);
        assert!(pos.timestamp_ms > 0);
    }

    #[test]
    fn test_parse_position_missing_coords_fails() {
        let raw = json!({ "timestamp": 1 });
        assert!(parse_position(&raw).is_err());
    }

    #[test]
    fn test_parse_floor_plan_region() {
        let raw = json!({
            "regionType": REGION_TYPE_FLOORPLAN,
            "regionId": "fp-1",
            "floorPlan": {
                "id": "fp-1",
                "name": "Ground floor",
                "url": "https://example.com/fp-1.png",
                "floorLevel": 0,
                "bottomLeft": [40.4135, -3.6925],
                "topRight": [40.4141, -3.6917]
            }
        });
        let region = parse_region(&raw).unwrap();
        let Region::FloorPlan(plan) = region else { panic!("expected floor plan") };
        assert_eq!(plan.floor, FloorNumber(0));
        assert_eq!(plan.bounds.south_west, LatLng::new(40.4135, -3.6925));
    }

    #[test]
    fn test_parse_venue_region() {
        let raw = json!({
            "regionType": REGION_TYPE_VENUE,
            "regionId": "museum",
            "venue": { "id": "museum", "name": "Museum" }
        });
        let region = parse_region(&raw).unwrap();
        assert!(matches!(region, Region::Venue(_)));
    }

    #[test]
    fn test_parse_region_unknown_type_fails() {
        let raw = json!({ "regionType": 9, "regionId": "x" });
        assert!(parse_region(&raw).is_err());
    }

    #[test]
    fn test_parse_heading() {
        let raw = json!({ "trueHeading": 182.5 });
        assert_eq!(parse_heading(&raw).unwrap(), 182.5);
    }

    #[test]
    fn test_parse_status() {
        let raw = json!({ "code": 0, "message": "license expired" });
        let (status, message) = parse_status(&raw).unwrap();
        assert_eq!(status, ServiceStatus::OutOfService);
        assert_eq!(message, "license expired");
    }

    #[test]
    fn test_parse_route() {
        let raw = json!({
            "legs": [
                {
                    "begin": { "latitude": 0.0, "longitude": 0.0, "floor": 1 },
                    "end": { "latitude": 0.0, "longitude": 1.0, "floor": 1 }
                }
            ],
            "finished": true
        });
        let route = parse_route(&raw).unwrap();
        assert_eq!(route.legs.len(), 1);
        assert!(route.finished);
        assert_eq!(route.legs[0].end.floor, FloorNumber(1));
    }
}
