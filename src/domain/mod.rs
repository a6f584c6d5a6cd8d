//! Domain models - core value types and the fan-in event enum
//!
//! This module contains the canonical data types used throughout the system:
//! - `Position` - a position fix from the positioning service
//! - `Region` - floor plan / venue regions with entry and exit semantics
//! - `Route` - wayfinding route geometry with a finished flag
//! - `Proximity` - coarse beacon distance classification
//! - `AppEvent` - the single fan-in event consumed by the bridge

pub mod route;
pub mod types;

// Re-export commonly used types at module level
