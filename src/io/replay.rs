//! Scenario replay driver
//!
//! Plays a recorded JSONL scenario through the real payload parsers,
//! standing in for the native positioning and beacon plugins. Each line is
//! a timestamped SDK callback:
//!
//! ```text
//! {"at_ms": 1000, "stream": "position", "payload": {"coords": {...}}}
//! ```
//!
//! Streams honor the watch contract: position/region/heading/status lines
//! are delivered only to a registered watcher, and route lines only while a
//! wayfinding request is active. `init_failures` lines script startup
//! failures to exercise the initialization retry policy, and
//! `session_failure` lines force a re-initialization mid-run.

use crate::domain::types::{AppEvent, LatLng};
use crate::io::beacons::{parse_ranging, BeaconRanger, BeaconRegion};
use crate::io::positioning::{
    parse_heading, parse_position, parse_region, parse_route, parse_status, PositioningConfig,
    PositioningSdk, SessionFailure, WatchId, WayfindingDestination,
};
use anyhow::{bail, Context};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// One scenario line: a scheduled SDK callback
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioLine {
    #[serde(default)]
    pub at_ms: u64,
    pub stream: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A parsed replay scenario
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Scripted number of failing `initialize` calls before success
    pub init_failures: u32,
    pub lines: Vec<ScenarioLine>,
}

impl Scenario {
    /// Load a scenario from a JSONL file. Blank lines and `#` comments are
    /// skipped; `init_failures` lines configure startup behavior instead of
    /// entering the timeline.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;

        let mut scenario = Scenario::default();
        for (lineno, raw) in content.lines().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            let line: ScenarioLine = serde_json::from_str(raw)
                .with_context(|| format!("{}:{}: malformed scenario line", path.display(), lineno + 1))?;
            if line.stream == "init_failures" {
                scenario.init_failures += line
                    .payload
                    .get("count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as u32;
            } else {
                scenario.lines.push(line);
            }
        }
        Ok(scenario)
    }
}

struct Watch {
    id: WatchId,
    tx: mpsc::Sender<AppEvent>,
}

#[derive(Default)]
struct ReplayState {
    next_watch_id: u64,
    position_watch: Option<Watch>,
    region_watch: Option<Watch>,
    heading_tx: Option<mpsc::Sender<AppEvent>>,
    status_tx: Option<mpsc::Sender<AppEvent>>,
    wayfinding_tx: Option<mpsc::Sender<AppEvent>>,
}

/// Replay implementation of the positioning and beacon seams
pub struct ReplaySdk {
    state: Mutex<ReplayState>,
    init_failures_left: AtomicU32,
    failure_tx: mpsc::Sender<SessionFailure>,
}

impl ReplaySdk {
    pub fn new(init_failures: u32, failure_tx: mpsc::Sender<SessionFailure>) -> Self {
        Self {
            state: Mutex::new(ReplayState::default()),
            init_failures_left: AtomicU32::new(init_failures),
            failure_tx,
        }
    }

    /// Play the scenario timeline, pacing lines by their `at_ms` offsets
    pub async fn run(
        self: Arc<Self>,
        scenario: Scenario,
        ui_tx: mpsc::Sender<AppEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let start = tokio::time::Instant::now();
        for line in &scenario.lines {
            let due = Duration::from_millis(line.at_ms);
            let elapsed = start.elapsed();
            if due > elapsed {
                tokio::select! {
                    _ = tokio::time::sleep(due - elapsed) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("scenario_replay_shutdown");
                            return;
                        }
                    }
                }
            }
            self.dispatch(line, &ui_tx).await;
        }
        info!(lines = scenario.lines.len(), "scenario_complete");
    }

    async fn dispatch(&self, line: &ScenarioLine, ui_tx: &mpsc::Sender<AppEvent>) {
        match line.stream.as_str() {
            "position" => match parse_position(&line.payload) {
                Ok(position) => {
                    self.deliver_position(AppEvent::Position(position)).await;
                }
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "region_enter" => match parse_region(&line.payload) {
                Ok(region) => self.deliver_region(AppEvent::EnterRegion(region)).await,
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "region_exit" => match parse_region(&line.payload) {
                Ok(region) => self.deliver_region(AppEvent::ExitRegion(region)).await,
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "heading" => match parse_heading(&line.payload) {
                Ok(degrees) => {
                    let tx = self.state.lock().heading_tx.clone();
                    if let Some(tx) = tx {
                        let _ = tx.send(AppEvent::Heading(degrees)).await;
                    }
                }
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "status" => match parse_status(&line.payload) {
                Ok((status, message)) => {
                    let tx = self.state.lock().status_tx.clone();
                    if let Some(tx) = tx {
                        let _ = tx.send(AppEvent::Status { status, message }).await;
                    }
                }
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "route" => match parse_route(&line.payload) {
                Ok(route) => {
                    // route updates flow only while a request is active
                    let tx = self.state.lock().wayfinding_tx.clone();
                    match tx {
                        Some(tx) => {
                            let _ = tx.send(AppEvent::RouteUpdate(route)).await;
                        }
                        None => debug!("route_update_dropped_no_request"),
                    }
                }
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "tap" => {
                let lat = line.payload.get("latitude").and_then(|v| v.as_f64());
                let lng = line.payload.get("longitude").and_then(|v| v.as_f64());
                match (lat, lng) {
                    (Some(lat), Some(lng)) => {
                        let _ = ui_tx.send(AppEvent::MapTap(LatLng::new(lat, lng))).await;
                    }
                    _ => error!(stream = %line.stream, "scenario_payload_invalid"),
                }
            }
            "zoom_start" => {
                let _ = ui_tx.send(AppEvent::ZoomStart).await;
            }
            "zoom_end" => {
                let _ = ui_tx.send(AppEvent::ZoomEnd).await;
            }
            "beacons" => match parse_ranging(&line.payload) {
                Ok(Some(event)) => {
                    let _ = ui_tx.send(AppEvent::BeaconRanged(event)).await;
                }
                Ok(None) => debug!("ranging_event_empty"),
                Err(e) => log_bad_payload(&line.stream, &e),
            },
            "notification_click" => {
                match line.payload.get("id").and_then(|v| v.as_u64()) {
                    Some(id) => {
                        let _ = ui_tx.send(AppEvent::NotificationClick(id as u32)).await;
                    }
                    None => error!(stream = %line.stream, "scenario_payload_invalid"),
                }
            }
            "session_failure" => {
                let reason = line
                    .payload
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("scripted session failure")
                    .to_string();
                let _ = self.failure_tx.send(SessionFailure { reason }).await;
            }
            // plugin lifecycle callbacks carry no state for us
            "monitoring_started" | "region_state" => {
                info!(stream = %line.stream, "beacon_region_callback");
            }
            other => warn!(stream = %other, "scenario_stream_unknown"),
        }
    }

    async fn deliver_position(&self, event: AppEvent) {
        let tx = self.state.lock().position_watch.as_ref().map(|w| w.tx.clone());
        match tx {
            Some(tx) => {
                let _ = tx.send(event).await;
            }
            None => debug!("position_dropped_no_watcher"),
        }
    }

    async fn deliver_region(&self, event: AppEvent) {
        let tx = self.state.lock().region_watch.as_ref().map(|w| w.tx.clone());
        match tx {
            Some(tx) => {
                let _ = tx.send(event).await;
            }
            None => debug!("region_dropped_no_watcher"),
        }
    }
}

fn log_bad_payload(stream: &str, error: &anyhow::Error) {
    // malformed payloads are integration errors; drop the event loudly
    error!(stream = %stream, error = %error, "scenario_payload_invalid");
}

#[async_trait]
impl PositioningSdk for ReplaySdk {
    async fn initialize(&self, config: &PositioningConfig) -> anyhow::Result<()> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            bail!("missing api key/secret");
        }
        let left = self.init_failures_left.load(Ordering::Relaxed);
        if left > 0 {
            self.init_failures_left.store(left - 1, Ordering::Relaxed);
            bail!("scripted initialization failure ({left} left)");
        }
        Ok(())
    }

    async fn watch_position(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId> {
        let mut state = self.state.lock();
        state.next_watch_id += 1;
        let id = WatchId(state.next_watch_id);
        state.position_watch = Some(Watch { id, tx: events });
        debug!(watch_id = %id, "position_watch_started");
        Ok(id)
    }

    async fn clear_watch(&self, id: WatchId) {
        let mut state = self.state.lock();
        if state.position_watch.as_ref().is_some_and(|w| w.id == id) {
            state.position_watch = None;
            debug!(watch_id = %id, "position_watch_cleared");
        }
    }

    async fn watch_region(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId> {
        let mut state = self.state.lock();
        state.next_watch_id += 1;
        let id = WatchId(state.next_watch_id);
        state.region_watch = Some(Watch { id, tx: events });
        debug!(watch_id = %id, "region_watch_started");
        Ok(id)
    }

    async fn clear_region_watch(&self, id: WatchId) {
        let mut state = self.state.lock();
        if state.region_watch.as_ref().is_some_and(|w| w.id == id) {
            state.region_watch = None;
            debug!(watch_id = %id, "region_watch_cleared");
        }
    }

    async fn watch_heading(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<()> {
        self.state.lock().heading_tx = Some(events);
        Ok(())
    }

    async fn watch_status(&self, events: mpsc::Sender<AppEvent>) -> anyhow::Result<()> {
        self.state.lock().status_tx = Some(events);
        Ok(())
    }

    async fn request_wayfinding_updates(
        &self,
        destination: WayfindingDestination,
        events: mpsc::Sender<AppEvent>,
    ) -> anyhow::Result<()> {
        info!(
            lat = %destination.latitude,
            lng = %destination.longitude,
            floor = %destination.floor,
            "wayfinding_updates_requested"
        );
        self.state.lock().wayfinding_tx = Some(events);
        Ok(())
    }

    async fn remove_wayfinding_updates(&self) {
        self.state.lock().wayfinding_tx = None;
        info!("wayfinding_updates_removed");
    }
}

#[async_trait]
impl BeaconRanger for ReplaySdk {
    async fn request_always_authorization(&self) -> anyhow::Result<()> {
        info!("beacon_always_authorization_requested");
        Ok(())
    }

    async fn start_monitoring(&self, region: &BeaconRegion) -> anyhow::Result<()> {
        info!(identifier = %region.identifier, minor = %region.minor, "beacon_monitoring_started");
        Ok(())
    }

    async fn start_ranging(&self, region: &BeaconRegion) -> anyhow::Result<()> {
        info!(identifier = %region.identifier, minor = %region.minor, "beacon_ranging_started");
        Ok(())
    }
}
