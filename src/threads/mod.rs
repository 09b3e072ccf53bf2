//! Multi-threaded architecture for AnveshaNav.
//!
//! Separates concerns into three threads:
//! - Telemetry thread: UDP ingest, pose updates, detection dispatch
//! - Mapping thread: ray-cast grid updates and frontier recompute
//! - Sequencer thread: the fixed-rate behaviour loop

mod mapping;
mod telemetry;

pub use mapping::MappingThread;
pub use telemetry::TelemetryThread;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::client::KendraClient;
use crate::config::AnveshaConfig;
use crate::error::Result;
use crate::frontier::AreaOfInterestFinder;
use crate::grid::GridMap;
use crate::sequencer::Sequencer;
use crate::shared::{LaserScan, SharedState};

/// Thread handles for the multi-threaded system.
pub struct ThreadHandles {
    pub telemetry: JoinHandle<()>,
    pub mapping: JoinHandle<()>,
    pub sequencer: JoinHandle<()>,
}

/// Spawn all threads and return handles.
#[allow(clippy::too_many_arguments)]
pub fn spawn_threads(
    config: AnveshaConfig,
    client: Arc<KendraClient>,
    state: Arc<SharedState>,
    grid: Arc<GridMap>,
    aoif: Arc<Mutex<AreaOfInterestFinder>>,
    sequencer: Arc<Sequencer>,
) -> Result<ThreadHandles> {
    // Bounded channel for scans so a slow mapping pass cannot pile up
    // unbounded telemetry
    let (scan_tx, scan_rx) = mpsc::sync_channel::<LaserScan>(10);

    let telemetry_state = Arc::clone(&state);
    let telemetry_grid = Arc::clone(&grid);
    let telemetry_sequencer = Arc::clone(&sequencer);
    let telemetry_config = config.clone();

    let telemetry_handle = thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || {
            let mut telemetry_thread = TelemetryThread::new(
                telemetry_config,
                client,
                telemetry_state,
                telemetry_grid,
                telemetry_sequencer,
                scan_tx,
            );
            telemetry_thread.run();
        })
        .expect("Failed to spawn telemetry thread");

    let mapping_state = Arc::clone(&state);
    let mapping_handle = thread::Builder::new()
        .name("mapping".into())
        .spawn(move || {
            let mut mapping_thread =
                MappingThread::new(config, mapping_state, grid, aoif, scan_rx);
            mapping_thread.run();
        })
        .expect("Failed to spawn mapping thread");

    let sequencer_handle = thread::Builder::new()
        .name("sequencer".into())
        .spawn(move || {
            sequencer.run();
        })
        .expect("Failed to spawn sequencer thread");

    Ok(ThreadHandles {
        telemetry: telemetry_handle,
        mapping: mapping_handle,
        sequencer: sequencer_handle,
    })
}
