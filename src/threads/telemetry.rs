//! Telemetry thread: UDP ingest, pose updates, and detection dispatch.
//!
//! This thread drains the UDP telemetry stream and:
//! - Updates the shared pose and marks the robot's grid cell
//! - Triggers the grid reset once the map is fully explored
//! - Forwards laser scans to the mapping thread (latest scan only)
//! - Feeds detection events straight into the sequencer, bypassing the
//!   tick cadence

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use crate::client::proto::kendra::telemetry::Payload;
use crate::client::KendraClient;
use crate::config::AnveshaConfig;
use crate::grid::{CellUpdate, GridMap};
use crate::sequencer::Sequencer;
use crate::shared::{LaserScan, Pose, SharedState};

/// Telemetry thread state and logic.
pub struct TelemetryThread {
    config: AnveshaConfig,
    client: Arc<KendraClient>,
    state: Arc<SharedState>,
    grid: Arc<GridMap>,
    sequencer: Arc<Sequencer>,
    scan_tx: SyncSender<LaserScan>,
    buffer: Vec<u8>,
}

impl TelemetryThread {
    pub fn new(
        config: AnveshaConfig,
        client: Arc<KendraClient>,
        state: Arc<SharedState>,
        grid: Arc<GridMap>,
        sequencer: Arc<Sequencer>,
        scan_tx: SyncSender<LaserScan>,
    ) -> Self {
        Self {
            config,
            client,
            state,
            grid,
            sequencer,
            scan_tx,
            buffer: KendraClient::telemetry_buffer(),
        }
    }

    /// Run the telemetry thread main loop.
    pub fn run(&mut self) {
        tracing::info!("Telemetry thread started");

        loop {
            if self.state.should_shutdown() {
                tracing::info!("Telemetry thread shutting down");
                break;
            }

            self.drain_telemetry();

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Process all available UDP messages.
    fn drain_telemetry(&mut self) {
        let mut messages_processed = 0;
        const MAX_MESSAGES_PER_ITERATION: usize = 50;

        // Keep only the latest scan per drain
        let mut pending_scan: Option<LaserScan> = None;

        loop {
            match self.client.recv_telemetry(&mut self.buffer) {
                Ok(Some(msg)) => {
                    messages_processed += 1;

                    match msg.payload {
                        Some(Payload::Pose(pose)) => {
                            self.handle_pose(Pose::new(pose.x, pose.y, pose.yaw));
                        }
                        Some(Payload::Scan(scan)) => {
                            pending_scan = Some(LaserScan {
                                ranges: scan.ranges,
                                range_max: self.config.laser.range_max,
                            });
                        }
                        Some(Payload::Detection(detection)) => {
                            self.sequencer.try_to_home(&detection);
                        }
                        None => {}
                    }

                    if messages_processed >= MAX_MESSAGES_PER_ITERATION {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Telemetry receive error: {}", e);
                    return;
                }
            }
        }

        if let Some(scan) = pending_scan {
            // Never block on a full channel; the next scan supersedes
            if let Err(e) = self.scan_tx.try_send(scan) {
                tracing::warn!("Failed to forward scan to mapping thread: {}", e);
            }
        }
    }

    /// Apply a localization update: shared pose, grid progress marker, and
    /// the continuous-coverage reset once the map is fully explored.
    fn handle_pose(&self, pose: Pose) {
        self.state.set_pose(pose);
        self.grid.update_grid(pose.x, pose.y, CellUpdate::Current);

        if self.grid.is_fully_explored() {
            tracing::info!("Map fully explored, resetting grid");
            self.grid.reset_grid();
        }
    }
}
