//! Edge-triggered proximity notifications for configured beacons
//!
//! A beacon fires its notification once when ranging first reports
//! Immediate proximity, then stays quiet until an intervening Near
//! reading re-arms it. Far and Unknown readings change nothing.

use crate::domain::types::{BeaconMinor, Proximity, RangingEvent};
use crate::infra::config::BeaconSpec;
use crate::infra::metrics::Metrics;
use crate::io::notifications::{LocalNotification, Notifier};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Follow-up action for a clicked notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    OpenUrl(&'static str),
}

/// Audio guide for the third exhibit, played on notification click
const AUDIO_GUIDE_URL: &str =
    "https://ia800406.us.archive.org/16/items/JM2013-10-05.flac16/V0/jm2013-10-05-t30-MP3-V0.mp3";

/// Static routing of notification ids to follow-up actions.
///
/// Ids 1 and 2 show their content in the notification itself and have no
/// follow-up.
pub fn click_action(id: u32) -> Option<ClickAction> {
    match id {
        3 => Some(ClickAction::OpenUrl(AUDIO_GUIDE_URL)),
        _ => None,
    }
}

pub struct BeaconNotifier {
    notifier: Box<dyn Notifier>,
    beacons: FxHashMap<BeaconMinor, BeaconSpec>,
    /// Edge-trigger state per beacon
    notified: FxHashMap<BeaconMinor, bool>,
    metrics: Arc<Metrics>,
}

impl BeaconNotifier {
    pub fn new(specs: &[BeaconSpec], notifier: Box<dyn Notifier>, metrics: Arc<Metrics>) -> Self {
        let beacons: FxHashMap<BeaconMinor, BeaconSpec> =
            specs.iter().map(|s| (BeaconMinor(s.minor), s.clone())).collect();
        Self { notifier, beacons, notified: FxHashMap::default(), metrics }
    }

    pub fn on_beacons_ranged(&mut self, event: RangingEvent) {
        let Some(spec) = self.beacons.get(&event.minor) else {
            debug!(minor = %event.minor, proximity = event.proximity.as_str(), "beacon_not_configured");
            return;
        };

        match event.proximity {
            Proximity::Immediate => {
                let notified = self.notified.entry(event.minor).or_insert(false);
                if *notified {
                    return;
                }
                let notification = LocalNotification {
                    id: spec.notification_id,
                    title: spec.title.clone(),
                    text: spec.text.clone(),
                    attachment: spec.attachment.clone(),
                    foreground: true,
                };
                match self.notifier.schedule(&notification) {
                    Ok(()) => {
                        *notified = true;
                        self.metrics.record_notification_fired();
                        info!(
                            minor = %event.minor,
                            id = %spec.notification_id,
                            "beacon_notification_fired"
                        );
                    }
                    Err(e) => {
                        error!(minor = %event.minor, error = %e, "notification_schedule_failed");
                    }
                }
            }
            Proximity::Near => {
                // backing off to Near re-arms the beacon
                if self.notified.insert(event.minor, false) == Some(true) {
                    debug!(minor = %event.minor, "beacon_rearmed");
                }
            }
            Proximity::Far | Proximity::Unknown => {}
        }
    }

    pub fn on_notification_click(&self, id: u32) {
        match click_action(id) {
            Some(ClickAction::OpenUrl(url)) => {
                info!(id = %id, url = %url, "notification_click_open_url");
            }
            None if self.beacons.values().any(|s| s.notification_id == id) => {
                info!(id = %id, "notification_click");
            }
            None => {
                warn!(id = %id, "notification_click_unknown");
            }
        }
    }
}
