//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations so event handlers never contend.
//! All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic
//! decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector
pub struct Metrics {
    /// Total events ever processed (monotonic)
    events_total: AtomicU64,
    /// Events since last report (reset on report)
    events_since_report: AtomicU64,
    /// Position fixes received (monotonic)
    positions: AtomicU64,
    /// Region enter/exit events (monotonic)
    region_events: AtomicU64,
    /// Beacon ranging events (monotonic)
    beacon_events: AtomicU64,
    /// Local notifications fired (monotonic)
    notifications_fired: AtomicU64,
    /// Wayfinding destination requests (monotonic)
    wayfinding_requests: AtomicU64,
    /// Routes that reported finished (monotonic)
    routes_completed: AtomicU64,
    /// Positioning initialization retries (monotonic)
    init_retries: AtomicU64,
    /// Map draw commands emitted (monotonic)
    draw_commands: AtomicU64,
    /// Map draw commands dropped on a full channel (monotonic)
    draw_commands_dropped: AtomicU64,
    /// Time of last report, for rate calculation
    last_report: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_total: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            positions: AtomicU64::new(0),
            region_events: AtomicU64::new(0),
            beacon_events: AtomicU64::new(0),
            notifications_fired: AtomicU64::new(0),
            wayfinding_requests: AtomicU64::new(0),
            routes_completed: AtomicU64::new(0),
            init_retries: AtomicU64::new(0),
            draw_commands: AtomicU64::new(0),
            draw_commands_dropped: AtomicU64::new(0),
            last_report: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_event_processed(&self) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        self.events_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_position(&self) {
        self.positions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_region_event(&self) {
        self.region_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_beacon_event(&self) {
        self.beacon_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_notification_fired(&self) {
        self.notifications_fired.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_wayfinding_request(&self) {
        self.wayfinding_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_route_completed(&self) {
        self.routes_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_init_retry(&self) {
        self.init_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_draw_command(&self) {
        self.draw_commands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_draw_command_dropped(&self) {
        self.draw_commands_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters, resetting the per-interval ones
    pub fn report(&self) -> MetricsSummary {
        let elapsed = {
            let mut last = self.last_report.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let events_interval = self.events_since_report.swap(0, Ordering::Relaxed);
        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            events_interval as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            events_total: self.events_total.load(Ordering::Relaxed),
            events_per_sec,
            positions: self.positions.load(Ordering::Relaxed),
            region_events: self.region_events.load(Ordering::Relaxed),
            beacon_events: self.beacon_events.load(Ordering::Relaxed),
            notifications_fired: self.notifications_fired.load(Ordering::Relaxed),
            wayfinding_requests: self.wayfinding_requests.load(Ordering::Relaxed),
            routes_completed: self.routes_completed.load(Ordering::Relaxed),
            init_retries: self.init_retries.load(Ordering::Relaxed),
            draw_commands: self.draw_commands.load(Ordering::Relaxed),
            draw_commands_dropped: self.draw_commands_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Consistent snapshot of all metrics counters
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub events_total: u64,
    pub events_per_sec: f64,
    pub positions: u64,
    pub region_events: u64,
    pub beacon_events: u64,
    pub notifications_fired: u64,
    pub wayfinding_requests: u64,
    pub routes_completed: u64,
    pub init_retries: u64,
    pub draw_commands: u64,
    pub draw_commands_dropped: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            events_total = %self.events_total,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            positions = %self.positions,
            region_events = %self.region_events,
            beacon_events = %self.beacon_events,
            notifications = %self.notifications_fired,
            wayfinding_requests = %self.wayfinding_requests,
            routes_completed = %self.routes_completed,
            init_retries = %self.init_retries,
            draw_commands = %self.draw_commands,
            draw_dropped = %self.draw_commands_dropped,
            "metrics_summary"
        );
    }
}
