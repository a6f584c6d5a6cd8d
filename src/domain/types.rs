//! Shared types for the indoor navigation gateway

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Newtype wrapper for floor numbers to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FloorNumber(pub i32);

impl std::fmt::Display for FloorNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for beacon minor numbers (the ranging plugin keys beacons by minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BeaconMinor(pub u16);

impl std::fmt::Display for BeaconMinor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Coordinate bounds of a floor plan image overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

/// A position fix from the positioning service.
///
/// Only the most recent fix is retained; there is no position history.
/// `floor` is absent while the service has not yet resolved a floor.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub center: LatLng,
    /// Accuracy radius in meters
    pub accuracy_m: f64,
    pub floor: Option<FloorNumber>,
    /// Fix timestamp (epoch ms)
    pub timestamp_ms: u64,
}

/// A floor plan the positioning service reports entry/exit for
#[derive(Debug, Clone, PartialEq)]
pub struct FloorPlan {
    pub id: String,
    pub name: String,
    pub floor: FloorNumber,
    /// Overlay imagery for the map surface
    pub image_url: String,
    pub bounds: LatLngBounds,
}

/// A venue the positioning service reports entry/exit for
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub id: String,
    pub name: String,
}

/// Region variants reported by the positioning service
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    FloorPlan(FloorPlan),
    Venue(Venue),
}

impl Region {
    pub fn kind(&self) -> &'static str {
        match self {
            Region::FloorPlan(_) => "floor_plan",
            Region::Venue(_) => "venue",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Region::FloorPlan(p) => &p.id,
            Region::Venue(v) => &v.id,
        }
    }
}

/// Coarse beacon distance classification from BLE ranging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    Immediate,
    Near,
    Far,
    Unknown,
}

impl std::str::FromStr for Proximity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ProximityImmediate" => Proximity::Immediate,
            "ProximityNear" => Proximity::Near,
            "ProximityFar" => Proximity::Far,
            _ => Proximity::Unknown,
        })
    }
}

impl Proximity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proximity::Immediate => "immediate",
            Proximity::Near => "near",
            Proximity::Far => "far",
            Proximity::Unknown => "unknown",
        }
    }
}

/// A single beacon ranging observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingEvent {
    pub minor: BeaconMinor,
    pub proximity: Proximity,
}

/// Positioning service status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Terminal, unrecoverable by the app
    OutOfService,
    TemporarilyUnavailable,
    Available,
    Limited,
    Unknown(i32),
}

impl ServiceStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ServiceStatus::OutOfService,
            1 => ServiceStatus::TemporarilyUnavailable,
            2 => ServiceStatus::Available,
            3 => ServiceStatus::Limited,
            other => ServiceStatus::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::OutOfService => "out_of_service",
            ServiceStatus::TemporarilyUnavailable => "temporarily_unavailable",
            ServiceStatus::Available => "available",
            ServiceStatus::Limited => "limited",
            ServiceStatus::Unknown(_) => "unknown",
        }
    }
}

/// Fan-in event for the bridge loop.
///
/// Events from a single SDK stream arrive in order; independent streams
/// interleave arbitrarily on the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Position(Position),
    EnterRegion(Region),
    ExitRegion(Region),
    /// True heading in degrees
    Heading(f64),
    RouteUpdate(crate::domain::route::Route),
    Status {
        status: ServiceStatus,
        message: String,
    },
    /// Positioning session is configured and all watches are active
    PositioningStarted,
    /// User tapped the map at the given coordinate
    MapTap(LatLng),
    ZoomStart,
    ZoomEnd,
    BeaconRanged(RangingEvent),
    /// User clicked a local notification, by numeric id
    NotificationClick(u32),
}
