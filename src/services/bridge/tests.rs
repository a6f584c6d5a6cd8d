//! Tests for the Bridge module

use super::*;
use crate::domain::route::{Route, RouteLeg, Waypoint};
use crate::domain::types::{
    epoch_ms, AppEvent, BeaconMinor, FloorNumber, FloorPlan, LatLng, LatLngBounds, Position,
    Proximity, RangingEvent, Region, ServiceStatus,
};
use crate::io::map::{create_map_channel, CircleTone, MapCommand};
use crate::io::notifications::{LocalNotification, Notifier};
use crate::io::positioning::{
    PositioningConfig, SessionFailure, WatchId, WayfindingDestination,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Positioning SDK double that records every call
struct MockSdk {
    init_failures_left: AtomicU32,
    init_calls: AtomicU32,
    next_watch: AtomicU64,
    position_watches: Mutex<Vec<WatchId>>,
    region_watches: Mutex<Vec<WatchId>>,
    cleared_watches: Mutex<Vec<WatchId>>,
    wayfinding_requests: Mutex<Vec<WayfindingDestination>>,
    remove_calls: AtomicU32,
}

impl MockSdk {
    fn new(init_failures: u32) -> Self {
        Self {
            init_failures_left: AtomicU32::new(init_failures),
            init_calls: AtomicU32::new(0),
            next_watch: AtomicU64::new(0),
            position_watches: Mutex::new(Vec::new()),
            region_watches: Mutex::new(Vec::new()),
            cleared_watches: Mutex::new(Vec::new()),
            wayfinding_requests: Mutex::new(Vec::new()),
            remove_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PositioningSdk for MockSdk {
    async fn initialize(&self, _config: &PositioningConfig) -> anyhow::Result<()> {
        self.init_calls.fetch_add(1, Ordering::Relaxed);
        let left = self.init_failures_left.load(Ordering::Relaxed);
        if left > 0 {
            self.init_failures_left.store(left - 1, Ordering::Relaxed);
            anyhow::bail!("mock initialization failure");
        }
        Ok(())
    }

    async fn watch_position(&self, _events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId> {
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::Relaxed) + 1);
        self.position_watches.lock().push(id);
        Ok(id)
    }

    async fn clear_watch(&self, id: WatchId) {
        self.cleared_watches.lock().push(id);
    }

    async fn watch_region(&self, _events: mpsc::Sender<AppEvent>) -> anyhow::Result<WatchId> {
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::Relaxed) + 1);
        self.region_watches.lock().push(id);
        Ok(id)
    }

    async fn clear_region_watch(&self, id: WatchId) {
        self.cleared_watches.lock().push(id);
    }

    async fn watch_heading(&self, _events: mpsc::Sender<AppEvent>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn watch_status(&self, _events: mpsc::Sender<AppEvent>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn request_wayfinding_updates(
        &self,
        destination: WayfindingDestination,
        _events: mpsc::Sender<AppEvent>,
    ) -> anyhow::Result<()> {
        self.wayfinding_requests.lock().push(destination);
        Ok(())
    }

    async fn remove_wayfinding_updates(&self) {
        self.remove_calls.fetch_add(1, Ordering::Relaxed);
    }
}

struct RecordingNotifier {
    scheduled: Arc<Mutex<Vec<LocalNotification>>>,
}

impl Notifier for RecordingNotifier {
    fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        self.scheduled.lock().push(notification.clone());
        Ok(())
    }
}

/// Test harness that keeps channel receivers alive so sends succeed
struct TestBridge {
    bridge: Bridge,
    map_rx: mpsc::Receiver<MapCommand>,
    sdk: Arc<MockSdk>,
    notifications: Arc<Mutex<Vec<LocalNotification>>>,
    #[allow(dead_code)]
    events_rx: mpsc::Receiver<AppEvent>,
}

impl std::ops::Deref for TestBridge {
    type Target = Bridge;
    fn deref(&self) -> &Self::Target {
        &self.bridge
    }
}

impl std::ops::DerefMut for TestBridge {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bridge
    }
}

fn create_test_bridge() -> TestBridge {
    let config = Config::default();
    let metrics = Arc::new(Metrics::new());
    let (map_handle, map_rx) = create_map_channel(256, metrics.clone());
    let (events_tx, events_rx) = mpsc::channel(64);
    let sdk = Arc::new(MockSdk::new(0));
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier { scheduled: notifications.clone() };
    let bridge =
        Bridge::new(&config, sdk.clone(), map_handle, Box::new(notifier), metrics, events_tx);
    TestBridge { bridge, map_rx, sdk, notifications, events_rx }
}

fn fix(lat: f64, lng: f64, floor: i32) -> AppEvent {
    AppEvent::Position(Position {
        center: LatLng::new(lat, lng),
        accuracy_m: 2.0,
        floor: Some(FloorNumber(floor)),
        timestamp_ms: epoch_ms(),
    })
}

fn enter_floor_plan(id: &str, floor: i32) -> AppEvent {
    AppEvent::EnterRegion(Region::FloorPlan(FloorPlan {
        id: id.to_string(),
        name: format!("Floor {floor}"),
        floor: FloorNumber(floor),
        image_url: format!("https://example.com/{id}.png"),
        bounds: LatLngBounds {
            south_west: LatLng::new(0.0, 0.0),
            north_east: LatLng::new(1.0, 1.0),
        },
    }))
}

fn finished_route(floor: i32) -> AppEvent {
    let wp = |lat: f64, lng: f64| Waypoint {
        position: LatLng::new(lat, lng),
        floor: FloorNumber(floor),
    };
    AppEvent::RouteUpdate(Route {
        legs: smallvec::smallvec![RouteLeg { begin: wp(0.0, 0.0), end: wp(0.0, 1.0) }],
        finished: true,
    })
}

fn ranged(minor: u16, proximity: Proximity) -> AppEvent {
    AppEvent::BeaconRanged(RangingEvent { minor: BeaconMinor(minor), proximity })
}

fn drain(rx: &mut mpsc::Receiver<MapCommand>) -> Vec<MapCommand> {
    let mut commands = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        commands.push(cmd);
    }
    commands
}

#[tokio::test]
async fn test_marker_visibility_tracks_floor() {
    let mut harness = create_test_bridge();

    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(fix(1.0, 2.0, 1)).await;
    let commands = drain(&mut harness.map_rx);
    assert!(commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: true, .. })));
    assert!(commands.iter().any(|c| matches!(
        c,
        MapCommand::UpdateAccuracyCircle { tone: CircleTone::Blue, .. }
    )));

    harness.process_event(fix(1.0, 2.0, 2)).await;
    let commands = drain(&mut harness.map_rx);
    assert!(commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: false, .. })));
    assert!(commands.iter().any(|c| matches!(
        c,
        MapCommand::UpdateAccuracyCircle { tone: CircleTone::Gray, .. }
    )));
}

#[tokio::test]
async fn test_floor_switch_hides_stale_marker() {
    let mut harness = create_test_bridge();

    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(fix(1.0, 2.0, 1)).await;
    drain(&mut harness.map_rx);

    // switching floors replays the stale floor-1 fix as hidden
    harness.process_event(enter_floor_plan("fp-2", 2)).await;
    let commands = drain(&mut harness.map_rx);
    assert!(commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: false, .. })));
    assert!(!commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: true, .. })));

    // a late fix still reporting the old floor must not re-show the marker
    harness.process_event(fix(1.0, 2.0, 1)).await;
    let commands = drain(&mut harness.map_rx);
    assert!(commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: false, .. })));
    assert!(!commands.iter().any(|c| matches!(c, MapCommand::UpdateMarker { visible: true, .. })));
}

#[tokio::test]
async fn test_tap_before_positioning_started_is_ignored() {
    let mut harness = create_test_bridge();
    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(AppEvent::MapTap(LatLng::new(1.0, 2.0))).await;
    assert!(harness.sdk.wayfinding_requests.lock().is_empty());
}

#[tokio::test]
async fn test_tap_without_displayed_floor_is_ignored() {
    let mut harness = create_test_bridge();
    harness.process_event(AppEvent::PositioningStarted).await;
    harness.process_event(AppEvent::MapTap(LatLng::new(1.0, 2.0))).await;
    assert!(harness.sdk.wayfinding_requests.lock().is_empty());
}

#[tokio::test]
async fn test_tap_requests_wayfinding_with_current_floor() {
    let mut harness = create_test_bridge();
    harness.process_event(AppEvent::PositioningStarted).await;
    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(AppEvent::MapTap(LatLng::new(1.5, 2.5))).await;

    let requests = harness.sdk.wayfinding_requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].latitude, 1.5);
    assert_eq!(requests[0].longitude, 2.5);
    assert_eq!(requests[0].floor, FloorNumber(1));
}

#[tokio::test]
async fn test_finished_route_tears_down_exactly_once() {
    let mut harness = create_test_bridge();
    harness.process_event(AppEvent::PositioningStarted).await;
    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(AppEvent::MapTap(LatLng::new(1.0, 2.0))).await;
    drain(&mut harness.map_rx);

    harness.process_event(finished_route(1)).await;
    assert_eq!(harness.sdk.remove_calls.load(Ordering::Relaxed), 1);
    assert!(drain(&mut harness.map_rx).iter().any(|c| matches!(c, MapCommand::ClearRoute)));

    // a trailing update after teardown is ignored
    harness.process_event(finished_route(1)).await;
    assert_eq!(harness.sdk.remove_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_out_of_service_surfaces_alert() {
    let mut harness = create_test_bridge();
    harness
        .process_event(AppEvent::Status {
            status: ServiceStatus::OutOfService,
            message: "license expired".to_string(),
        })
        .await;

    assert!(harness.is_out_of_service());
    assert!(drain(&mut harness.map_rx)
        .iter()
        .any(|c| matches!(c, MapCommand::Alert { message } if message.contains("license expired"))));
}

#[tokio::test]
async fn test_recoverable_status_is_not_terminal() {
    let mut harness = create_test_bridge();
    harness
        .process_event(AppEvent::Status {
            status: ServiceStatus::TemporarilyUnavailable,
            message: "no coverage".to_string(),
        })
        .await;
    assert!(!harness.is_out_of_service());
    assert!(!drain(&mut harness.map_rx).iter().any(|c| matches!(c, MapCommand::Alert { .. })));
}

#[tokio::test]
async fn test_beacon_sequence_notifies_twice() {
    let mut harness = create_test_bridge();
    // default config carries beacon minor 30708 as notification 1
    for proximity in [
        Proximity::Far,
        Proximity::Immediate,
        Proximity::Immediate,
        Proximity::Near,
        Proximity::Immediate,
    ] {
        harness.process_event(ranged(30708, proximity)).await;
    }

    let fired = harness.notifications.lock();
    assert_eq!(fired.len(), 2);
    assert!(fired.iter().all(|n| n.id == 1));
}

#[tokio::test]
async fn test_zoom_gate_defers_position_redraw() {
    let mut harness = create_test_bridge();
    harness.process_event(enter_floor_plan("fp-1", 1)).await;
    harness.process_event(fix(1.0, 2.0, 1)).await;
    drain(&mut harness.map_rx);

    harness.process_event(AppEvent::ZoomStart).await;
    harness.process_event(fix(5.0, 6.0, 1)).await;
    assert!(drain(&mut harness.map_rx).is_empty());

    harness.process_event(AppEvent::ZoomEnd).await;
    assert!(drain(&mut harness.map_rx).iter().any(|c| matches!(
        c,
        MapCommand::UpdateAccuracyCircle { center, .. } if *center == LatLng::new(5.0, 6.0)
    )));
}

// --- supervisor tests ---

fn supervisor_setup(
    init_failures: u32,
) -> (
    Arc<MockSdk>,
    PositioningSupervisor,
    mpsc::Receiver<AppEvent>,
    mpsc::Sender<SessionFailure>,
    Arc<Metrics>,
) {
    let sdk = Arc::new(MockSdk::new(init_failures));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (failure_tx, failure_rx) = mpsc::channel(4);
    let metrics = Arc::new(Metrics::new());
    let config =
        PositioningConfig { api_key: "key".to_string(), api_secret: "secret".to_string() };
    let supervisor =
        PositioningSupervisor::new(sdk.clone(), config, events_tx, failure_rx, metrics.clone());
    (sdk, supervisor, events_rx, failure_tx, metrics)
}

#[tokio::test(start_paused = true)]
async fn test_init_retries_on_fixed_delay_until_success() {
    let (sdk, supervisor, mut events_rx, _failure_tx, metrics) = supervisor_setup(2);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(supervisor.run(shutdown_rx));

    // two scripted failures, then configured; paused time auto-advances
    // through the fixed retry sleeps
    let event = events_rx.recv().await;
    assert_eq!(event, Some(AppEvent::PositioningStarted));
    assert_eq!(sdk.init_calls.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.report().init_retries, 2);
    assert_eq!(sdk.position_watches.lock().len(), 1);
    assert_eq!(sdk.region_watches.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_failure_resubscribes_clearing_watches() {
    let (sdk, supervisor, mut events_rx, failure_tx, _metrics) = supervisor_setup(0);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(supervisor.run(shutdown_rx));

    assert_eq!(events_rx.recv().await, Some(AppEvent::PositioningStarted));
    let first_watches: Vec<WatchId> = {
        let mut ids = sdk.position_watches.lock().clone();
        ids.extend(sdk.region_watches.lock().iter().copied());
        ids
    };

    failure_tx
        .send(SessionFailure { reason: "watch error".to_string() })
        .await
        .unwrap();

    // a second session comes up and the stale handles were cleared first
    assert_eq!(events_rx.recv().await, Some(AppEvent::PositioningStarted));
    assert_eq!(sdk.position_watches.lock().len(), 2);
    let cleared = sdk.cleared_watches.lock();
    for id in first_watches {
        assert!(cleared.contains(&id), "stale watch {id} was not cleared");
    }
}
