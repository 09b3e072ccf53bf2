//! AnveshaNav - Exploration and homing controller
//!
//! Connects to a KendraIO hub, maintains an occupancy grid of a partially
//! unknown environment, repeatedly navigates toward the nearest unexplored
//! area of interest, and switches to a homing behaviour when the external
//! detector reports a candidate object.
//!
//! ## Multi-Threaded Architecture
//!
//! - **Telemetry Thread**: drains the UDP stream, updates the pose,
//!   dispatches detection events into the sequencer
//! - **Mapping Thread**: ray-casts scans into the grid, recomputes
//!   frontier clusters
//! - **Sequencer Thread** (25Hz): runs the active behaviour each tick
//! - **Main Thread**: status reporting, idle detection, shutdown

mod behaviour;
mod client;
mod config;
mod error;
mod frontier;
mod grid;
mod sequencer;
mod shared;
mod threads;
mod utils;

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use behaviour::BehaviourTuning;
use client::{KendraClient, NavService};
use config::AnveshaConfig;
use error::{AnveshaError, Result};
use frontier::AreaOfInterestFinder;
use grid::{CellState, GridMap};
use sequencer::Sequencer;
use shared::SharedState;
use threads::spawn_threads;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anvesha_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        AnveshaConfig::load(config_path)?
    } else {
        // Check for --hub argument
        let hub_ip = args
            .iter()
            .position(|a| a == "--hub")
            .and_then(|i| args.get(i + 1))
            .cloned();

        let mut config = if Path::new("anvesha.toml").exists() {
            info!("Loading configuration from anvesha.toml");
            AnveshaConfig::load(Path::new("anvesha.toml"))?
        } else {
            info!("Using default configuration");
            AnveshaConfig::default()
        };

        if let Some(ip) = hub_ip {
            info!("Using hub IP: {}", ip);
            config.connection.hub_ip = ip;
        }

        config
    };

    info!("AnveshaNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Connecting to {}:{}",
        config.connection.hub_ip, config.connection.port
    );

    let client = Arc::new(KendraClient::connect_timeout(
        &config.address(),
        Duration::from_millis(config.connection.timeout_ms),
        Duration::from_millis(config.connection.goal_wait_ms),
    )?);

    // The static map must arrive within the startup bound; anything else
    // is fatal
    info!("Requesting static map...");
    let map_data = client.request_map(Duration::from_millis(config.connection.startup_timeout_ms))?;
    info!(
        "Static map: {}x{} cells at {:.2}m resolution",
        map_data.width, map_data.height, map_data.resolution
    );

    let grid = Arc::new(GridMap::from_map_data(
        &map_data,
        config.grid.explored_threshold,
    )?);
    let state = Arc::new(SharedState::new(config.objects.num_classes));
    let aoif = Arc::new(Mutex::new(AreaOfInterestFinder::new(
        config.frontier.scale,
        config.frontier.min_cluster_size,
    )));

    let tuning = BehaviourTuning {
        approach_threshold: config.homing.approach_threshold,
        creep_linear_vel: config.homing.creep_linear_vel,
        forward_sector: config.laser.forward_sector,
    };
    let sequencer = Arc::new(Sequencer::new(
        Arc::clone(&state),
        Arc::clone(&grid),
        Arc::clone(&aoif),
        Arc::clone(&client) as Arc<dyn NavService>,
        tuning,
        config.sequencer.rate_hz,
    ));

    info!("Starting exploration...");
    let handles = spawn_threads(
        config.clone(),
        Arc::clone(&client),
        Arc::clone(&state),
        Arc::clone(&grid),
        aoif,
        Arc::clone(&sequencer),
    )?;

    // Main thread: status reporting, idle detection, thread supervision
    let check_interval = Duration::from_millis(500);
    let status_interval = Duration::from_secs_f32(config.monitor.status_interval_secs);
    let idle_timeout = Duration::from_secs_f32(config.monitor.idle_timeout_secs);

    let mut last_status = Instant::now();
    let mut last_progress = Instant::now();
    let mut last_pose = state.pose();

    loop {
        std::thread::sleep(check_interval);

        // Idle detection: warn the active behaviour when the pose has not
        // moved meaningfully for too long
        let pose = state.pose();
        let moved = (pose.x - last_pose.x).hypot(pose.y - last_pose.y);
        if moved >= config.monitor.min_progress_distance {
            last_pose = pose;
            last_progress = Instant::now();
        } else if last_progress.elapsed() >= idle_timeout {
            sequencer.warn_idle();
            last_progress = Instant::now();
        }

        if last_status.elapsed() >= status_interval {
            let (found, total) = state.found_summary();
            info!(
                "Status: behaviour={}, cycles={}, unknown={:.1}%, objects={}/{}",
                sequencer.behaviour_name(),
                sequencer.cycles(),
                grid.unknown_fraction() * 100.0,
                found,
                total
            );
            last_status = Instant::now();
        }

        if handles.telemetry.is_finished()
            || handles.mapping.is_finished()
            || handles.sequencer.is_finished()
        {
            warn!("A worker thread exited unexpectedly");
            break;
        }
    }

    // Signal shutdown to all threads
    state.signal_shutdown();
    info!("Waiting for threads to finish...");

    if let Err(e) = handles.telemetry.join() {
        error!("Telemetry thread panicked: {:?}", e);
    }
    if let Err(e) = handles.mapping.join() {
        error!("Mapping thread panicked: {:?}", e);
    }
    if let Err(e) = handles.sequencer.join() {
        error!("Sequencer thread panicked: {:?}", e);
    }

    info!("Saving grid snapshot...");
    save_grid_snapshot(&config, &grid)?;

    info!("AnveshaNav finished after {} cycles", sequencer.cycles());
    Ok(())
}

/// Write the final grid snapshot as a PGM image for offline inspection.
fn save_grid_snapshot(config: &AnveshaConfig, grid: &GridMap) -> Result<()> {
    let path = Path::new(&config.output.map_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AnveshaError::Config(format!("Failed to create output directory: {}", e))
        })?;
    }

    let snapshot = grid.snapshot();
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "P5")?;
    writeln!(file, "{} {}", grid.width(), grid.height())?;
    writeln!(file, "255")?;

    let pixels: Vec<u8> = snapshot
        .iter()
        .map(|state| match state {
            CellState::Occupied => 0,
            CellState::Unknown => 128,
            CellState::Current => 200,
            CellState::Free => 255,
        })
        .collect();
    file.write_all(&pixels)?;

    info!("Grid snapshot saved to {:?}", path);
    Ok(())
}
