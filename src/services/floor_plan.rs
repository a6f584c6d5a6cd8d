//! Floor plan and venue overlay selection
//!
//! Tracks which floor-plan overlay is rendered on the map. Entering a
//! region replaces any previously active overlay of the same kind; at most
//! one floor plan and one venue are active at a time. A change of the
//! displayed floor is reported back to the caller so dependent components
//! can re-sync.

use crate::domain::types::{FloorNumber, FloorPlan, Venue};
use crate::io::map::{MapCommand, MapHandle};
use tracing::info;

/// The displayed floor changed as a result of a region transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorChange {
    pub from: Option<FloorNumber>,
    pub to: Option<FloorNumber>,
}

pub struct FloorPlanSelector {
    map: MapHandle,
    current_plan: Option<FloorPlan>,
    current_venue: Option<Venue>,
}

impl FloorPlanSelector {
    pub fn new(map: MapHandle) -> Self {
        Self { map, current_plan: None, current_venue: None }
    }

    /// Floor of the displayed plan, if any
    pub fn floor_number(&self) -> Option<FloorNumber> {
        self.current_plan.as_ref().map(|p| p.floor)
    }

    pub fn on_enter_floor_plan(&mut self, plan: FloorPlan) -> Option<FloorChange> {
        let from = self.floor_number();

        if let Some(previous) = self.current_plan.take() {
            self.map.send(MapCommand::RemoveFloorPlan { id: previous.id });
        }
        self.map.send(MapCommand::ShowFloorPlan {
            id: plan.id.clone(),
            image_url: plan.image_url.clone(),
            bounds: plan.bounds,
        });
        info!(id = %plan.id, name = %plan.name, floor = %plan.floor, "floor_plan_entered");
        self.current_plan = Some(plan);

        self.change(from)
    }

    pub fn on_exit_floor_plan(&mut self) -> Option<FloorChange> {
        let from = self.floor_number();
        if let Some(previous) = self.current_plan.take() {
            info!(id = %previous.id, "floor_plan_exited");
            self.map.send(MapCommand::RemoveFloorPlan { id: previous.id });
        }
        self.change(from)
    }

    pub fn on_enter_venue(&mut self, venue: Venue) {
        info!(id = %venue.id, name = %venue.name, "venue_entered");
        self.current_venue = Some(venue);
    }

    pub fn on_exit_venue(&mut self) {
        if let Some(venue) = self.current_venue.take() {
            info!(id = %venue.id, "venue_exited");
        }
    }

    pub fn current_venue(&self) -> Option<&Venue> {
        self.current_venue.as_ref()
    }

    fn change(&self, from: Option<FloorNumber>) -> Option<FloorChange> {
        let to = self.floor_number();
        (from != to).then_some(FloorChange { from, to })
    }
}
