//! Services - UI state transitions and event orchestration
//!
//! This module contains the components the bridge coordinates:
//! - `bridge` - central event orchestrator and positioning supervisor
//! - `map_view` - blue-dot and accuracy-circle rendering
//! - `floor_plan` - floor plan / venue overlay selection
//! - `wayfinding` - route drawing and navigation session state
//! - `beacon_notifier` - edge-triggered beacon proximity notifications

pub mod beacon_notifier;
pub mod bridge;
pub mod floor_plan;
pub mod map_view;
pub mod wayfinding;

// Re-export commonly used types
pub use beacon_notifier::BeaconNotifier;
pub use bridge::{Bridge, PositioningSupervisor};
pub use floor_plan::{FloorChange, FloorPlanSelector};
pub use map_view::MapViewAdapter;
pub use wayfinding::WayfindingController;
