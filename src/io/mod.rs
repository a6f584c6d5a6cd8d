//! IO modules - external system interfaces
//!
//! This module contains the seams to the external SDKs and the map surface:
//! - `positioning` - positioning service trait and SDK payload parsing
//! - `map` - typed command channel for the map surface and its renderer
//! - `beacons` - beacon ranging plugin seam and payload parsing
//! - `notifications` - local notification scheduling seam
//! - `replay` - JSONL scenario replay implementation of the SDK seams

pub mod beacons;
pub mod map;
pub mod notifications;
pub mod positioning;
pub mod replay;

// Re-export commonly used types
pub use beacons::{parse_ranging, BeaconRanger, BeaconRegion};
pub use map::{create_map_channel, run_map_renderer, CircleTone, MapCommand, MapHandle};
pub use notifications::{LocalNotification, LogNotifier, Notifier};
pub use positioning::{
    PositioningConfig, PositioningSdk, SessionFailure, WatchId, WayfindingDestination,
};
pub use replay::{ReplaySdk, Scenario};
