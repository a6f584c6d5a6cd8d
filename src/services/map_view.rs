//! Blue-dot rendering on the map surface
//!
//! Keeps the accuracy circle and position marker in sync with the latest
//! fix. The marker is shown only while the fix's floor matches the
//! displayed floor; on a mismatch the circle goes gray and the marker is
//! hidden. Redraws are suppressed while a zoom gesture is in progress
//! (the surface cannot update graphics mid-zoom) and replayed when it
//! ends.

use crate::domain::types::{FloorNumber, Position};
use crate::io::map::{CircleTone, MapCommand, MapHandle};
use tracing::debug;

pub struct MapViewAdapter {
    map: MapHandle,
    /// Zoom applied once on the first fix
    first_fix_zoom: u8,
    last_position: Option<Position>,
    /// Circle and marker exist on the surface after the first fix
    graphics_created: bool,
    zoom_ongoing: bool,
}

impl MapViewAdapter {
    pub fn new(map: MapHandle, first_fix_zoom: u8) -> Self {
        Self { map, first_fix_zoom, last_position: None, graphics_created: false, zoom_ongoing: false }
    }

    /// Latest position fix, retained for replay on floor change or zoom end
    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn on_location_changed(&mut self, position: &Position, displayed_floor: Option<FloorNumber>) {
        self.last_position = Some(position.clone());

        // the surface cannot update graphics while a zoom is in progress
        if self.zoom_ongoing {
            debug!("location_update_deferred_zoom");
            return;
        }

        let first_fix = !self.graphics_created;
        self.graphics_created = true;
        self.draw(position, displayed_floor);

        if first_fix {
            self.map.send(MapCommand::SetView {
                center: position.center,
                zoom: self.first_fix_zoom,
            });
        }
    }

    pub fn on_heading_changed(&mut self, degrees: f64) {
        // no marker to rotate before the first fix
        if self.graphics_created {
            self.map.send(MapCommand::SetMarkerHeading { degrees });
        }
    }

    pub fn on_zoom_start(&mut self) {
        self.zoom_ongoing = true;
    }

    pub fn on_zoom_end(&mut self, displayed_floor: Option<FloorNumber>) {
        self.zoom_ongoing = false;
        self.refresh(displayed_floor);
    }

    /// Replay the last fix, re-evaluating marker visibility.
    ///
    /// Called after a floor change so a stale fix for the previous floor
    /// does not keep the marker visible on the new one.
    pub fn refresh(&mut self, displayed_floor: Option<FloorNumber>) {
        if self.zoom_ongoing || !self.graphics_created {
            return;
        }
        if let Some(position) = self.last_position.clone() {
            self.draw(&position, displayed_floor);
        }
    }

    fn draw(&self, position: &Position, displayed_floor: Option<FloorNumber>) {
        let on_displayed_floor =
            displayed_floor.is_some() && position.floor == displayed_floor;

        let tone = if on_displayed_floor { CircleTone::Blue } else { CircleTone::Gray };
        self.map.send(MapCommand::UpdateAccuracyCircle {
            center: position.center,
            radius_m: position.accuracy_m,
            tone,
        });
        self.map.send(MapCommand::UpdateMarker {
            center: position.center,
            visible: on_displayed_floor,
        });
    }
}
