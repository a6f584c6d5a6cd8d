//! Typed command channel for the map surface
//!
//! The map widget is the one resource mutated by several components
//! (blue dot, floor overlay, route polyline). All mutation flows through
//! this bounded channel and is applied by a single renderer task, so the
//! surface never sees concurrent writers.

use crate::domain::types::{LatLng, LatLngBounds};
use crate::infra::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Accuracy circle tone: blue when the dot is on the displayed floor,
/// gray when it is not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleTone {
    Blue,
    Gray,
}

impl CircleTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircleTone::Blue => "blue",
            CircleTone::Gray => "gray",
        }
    }
}

/// Drawing commands applied to the map surface
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    /// Attach the imagery tile layer (only issued when a token is configured)
    AddTileLayer { url_template: String, max_zoom: u8 },
    /// One-time pan/zoom to the first position fix
    SetView { center: LatLng, zoom: u8 },
    /// Upsert the accuracy circle
    UpdateAccuracyCircle { center: LatLng, radius_m: f64, tone: CircleTone },
    /// Upsert the blue-dot marker; `visible` enforces the floor-match rule
    UpdateMarker { center: LatLng, visible: bool },
    /// Rotate the blue-dot marker to the device heading
    SetMarkerHeading { degrees: f64 },
    /// Display a floor plan image overlay, replacing any previous one
    ShowFloorPlan { id: String, image_url: String, bounds: LatLngBounds },
    RemoveFloorPlan { id: String },
    /// Draw the wayfinding polyline, replacing any previous one
    DrawRoute { points: Vec<LatLng> },
    ClearRoute,
    /// Surface a message directly to the user
    Alert { message: String },
}

impl MapCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            MapCommand::AddTileLayer { .. } => "add_tile_layer",
            MapCommand::SetView { .. } => "set_view",
            MapCommand::UpdateAccuracyCircle { .. } => "update_accuracy_circle",
            MapCommand::UpdateMarker { .. } => "update_marker",
            MapCommand::SetMarkerHeading { .. } => "set_marker_heading",
            MapCommand::ShowFloorPlan { .. } => "show_floor_plan",
            MapCommand::RemoveFloorPlan { .. } => "remove_floor_plan",
            MapCommand::DrawRoute { .. } => "draw_route",
            MapCommand::ClearRoute => "clear_route",
            MapCommand::Alert { .. } => "alert",
        }
    }
}

/// Sender handle for map commands
///
/// Clone this to share across components. Non-blocking: if the renderer
/// falls behind and the channel fills, commands are dropped and counted.
/// Every command is an upsert of current state, so a dropped frame is
/// corrected by the next one.
#[derive(Clone)]
pub struct MapHandle {
    tx: mpsc::Sender<MapCommand>,
    metrics: Arc<Metrics>,
}

impl MapHandle {
    pub fn new(tx: mpsc::Sender<MapCommand>, metrics: Arc<Metrics>) -> Self {
        Self { tx, metrics }
    }

    pub fn send(&self, command: MapCommand) {
        match self.tx.try_send(command) {
            Ok(()) => self.metrics.record_draw_command(),
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                self.metrics.record_draw_command_dropped();
                warn!(command = cmd.kind(), "map_command_dropped");
            }
            Err(mpsc::error::TrySendError::Closed(cmd)) => {
                error!(command = cmd.kind(), "map_channel_closed");
            }
        }
    }
}

/// Create a new map command channel pair
pub fn create_map_channel(
    capacity: usize,
    metrics: Arc<Metrics>,
) -> (MapHandle, mpsc::Receiver<MapCommand>) {
    let (tx, rx) = mpsc::channel(capacity);
    (MapHandle::new(tx, metrics), rx)
}

/// Headless renderer: applies map commands by logging them.
///
/// Stands in for a real map widget; the command stream is the contract.
pub async fn run_map_renderer(
    mut rx: mpsc::Receiver<MapCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { return };
                apply_command(&cmd);
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("map_renderer_shutdown");
                    return;
                }
            }
        }
    }
}

fn apply_command(cmd: &MapCommand) {
    match cmd {
        MapCommand::AddTileLayer { url_template, max_zoom } => {
            info!(url = %url_template, max_zoom = %max_zoom, "map_tile_layer_added");
        }
        MapCommand::SetView { center, zoom } => {
            info!(lat = %center.lat, lng = %center.lng, zoom = %zoom, "map_view_set");
        }
        MapCommand::UpdateAccuracyCircle { center, radius_m, tone } => {
            info!(
                lat = %center.lat,
                lng = %center.lng,
                radius_m = %radius_m,
                tone = tone.as_str(),
                "map_accuracy_circle"
            );
        }
        MapCommand::UpdateMarker { center, visible } => {
            info!(lat = %center.lat, lng = %center.lng, visible = %visible, "map_marker");
        }
        MapCommand::SetMarkerHeading { degrees } => {
            info!(degrees = %degrees, "map_marker_heading");
        }
        MapCommand::ShowFloorPlan { id, image_url, .. } => {
            info!(id = %id, image_url = %image_url, "map_floor_plan_shown");
        }
        MapCommand::RemoveFloorPlan { id } => {
            info!(id = %id, "map_floor_plan_removed");
        }
        MapCommand::DrawRoute { points } => {
            info!(points = points.len(), "map_route_drawn");
        }
        MapCommand::ClearRoute => {
            info!("map_route_cleared");
        }
        MapCommand::Alert { message } => {
            error!(message = %message, "user_alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let metrics = Arc::new(Metrics::new());
        let (handle, mut rx) = create_map_channel(4, metrics);

        handle.send(MapCommand::ClearRoute);
        assert_eq!(rx.recv().await, Some(MapCommand::ClearRoute));
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let metrics = Arc::new(Metrics::new());
        let (handle, _rx) = create_map_channel(1, metrics.clone());

        handle.send(MapCommand::ClearRoute);
        // channel is full; this must not block
        handle.send(MapCommand::ClearRoute);

        let summary = metrics.report();
        assert_eq!(summary.draw_commands, 1);
        assert_eq!(summary.draw_commands_dropped, 1);
    }
}
