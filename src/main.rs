//! indoor-nav - indoor positioning display and wayfinding gateway
//!
//! Shows the user's indoor position on a floor-plan map, draws
//! turn-by-turn wayfinding routes, and fires proximity notifications near
//! Bluetooth beacons. All position, route, and proximity computation is
//! performed by external SDKs behind trait seams; this service forwards
//! their event streams into map mutations and user taps back into SDK
//! requests.
//!
//! Module structure:
//! - `domain/` - Core value types (Position, Region, Route, Proximity)
//! - `io/` - External seams (positioning, map surface, beacons, replay)
//! - `services/` - Event orchestration (Bridge, MapView, Wayfinding)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use indoor_nav::infra::Config;
use indoor_nav::infra::Metrics;
use indoor_nav::io::beacons::{BeaconRanger, BeaconRegion};
use indoor_nav::io::map::{create_map_channel, run_map_renderer, MapCommand};
use indoor_nav::io::notifications::LogNotifier;
use indoor_nav::io::positioning::PositioningConfig;
use indoor_nav::io::replay::{ReplaySdk, Scenario};
use indoor_nav::services::{Bridge, PositioningSupervisor};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// indoor-nav - Indoor positioning and wayfinding gateway
#[derive(Parser, Debug)]
#[command(name = "indoor-nav", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Path to the JSONL scenario replayed through the SDK seams
    #[arg(short, long, default_value = "scenarios/demo.jsonl")]
    scenario: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("indoor-nav starting");

    let args = Args::parse();

    let config = Config::load_from_path(&args.config);
    info!(
        config_file = %config.config_file(),
        api_key_set = !config.api_key().is_empty(),
        tile_token_set = config.tile_access_token().is_some(),
        first_fix_zoom = %config.first_fix_zoom(),
        beacons = config.beacons().len(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        "config_loaded"
    );

    let scenario = Scenario::from_file(&args.scenario)?;
    info!(scenario = %args.scenario, lines = scenario.lines.len(), "scenario_loaded");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Map surface: renderer task consumes the command channel
    let (map_handle, map_rx) = create_map_channel(1000, metrics.clone());
    let renderer_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        run_map_renderer(map_rx, renderer_shutdown).await;
    });

    // Tile layer only renders imagery when a token is configured
    if let Some(token) = config.tile_access_token() {
        map_handle.send(MapCommand::AddTileLayer {
            url_template: format!("{}?access_token={}", config.tile_url_template(), token),
            max_zoom: config.tile_max_zoom(),
        });
    } else {
        warn!("tile_token_missing_base_map_only");
    }

    // Fan-in event channel (bounded for backpressure)
    let (event_tx, event_rx) = mpsc::channel(1000);

    // Replay SDK standing in for the native plugins
    let (failure_tx, failure_rx) = mpsc::channel(8);
    let sdk = Arc::new(ReplaySdk::new(scenario.init_failures, failure_tx));

    // Beacon region monitoring (requires always-on location authorization)
    sdk.request_always_authorization().await?;
    for spec in config.beacons() {
        let region = BeaconRegion::from_spec(spec);
        sdk.start_monitoring(&region).await?;
        sdk.start_ranging(&region).await?;
    }

    // Positioning session supervisor (initialize + watch streams, fixed-delay retry)
    let positioning_config = PositioningConfig {
        api_key: config.api_key().to_string(),
        api_secret: config.api_secret().to_string(),
    };
    let supervisor = PositioningSupervisor::new(
        sdk.clone(),
        positioning_config,
        event_tx.clone(),
        failure_rx,
        metrics.clone(),
    );
    let supervisor_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        supervisor.run(supervisor_shutdown).await;
    });

    // Scenario pump
    let pump_sdk = sdk.clone();
    let pump_tx = event_tx.clone();
    let pump_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        pump_sdk.run(scenario, pump_tx, pump_shutdown).await;
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run bridge - consumes events until shutdown
    let mut bridge = Bridge::new(
        &config,
        sdk,
        map_handle,
        Box::new(LogNotifier),
        metrics,
        event_tx,
    );
    info!("bridge_started");
    bridge.run(event_rx, shutdown_rx).await;

    info!("indoor-nav shutdown complete");
    Ok(())
}
