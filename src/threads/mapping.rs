//! Mapping thread: ray-cast grid updates and frontier recompute.
//!
//! Receives laser scans from the telemetry thread and:
//! - Publishes the scan snapshot for the homing behaviour
//! - Marks ray-traced cells as confirmed free along each sampled beam
//! - Recomputes the frontier clusters against the updated grid

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::AnveshaConfig;
use crate::frontier::AreaOfInterestFinder;
use crate::grid::{CellUpdate, GridMap};
use crate::shared::{ray_points, LaserScan, SharedState};
use crate::utils::scan_index;

/// Mapping thread state and logic.
pub struct MappingThread {
    state: Arc<SharedState>,
    grid: Arc<GridMap>,
    aoif: Arc<Mutex<AreaOfInterestFinder>>,
    scan_rx: Receiver<LaserScan>,
    /// Sampled beam bearings in degrees
    bearings: Vec<i32>,
    range_max: f32,
}

impl MappingThread {
    pub fn new(
        config: AnveshaConfig,
        state: Arc<SharedState>,
        grid: Arc<GridMap>,
        aoif: Arc<Mutex<AreaOfInterestFinder>>,
        scan_rx: Receiver<LaserScan>,
    ) -> Self {
        Self {
            state,
            grid,
            aoif,
            scan_rx,
            bearings: config.laser_bearings(),
            range_max: config.laser.range_max,
        }
    }

    /// Run the mapping thread main loop.
    pub fn run(&mut self) {
        tracing::info!("Mapping thread started");

        loop {
            if self.state.should_shutdown() {
                tracing::info!("Mapping thread shutting down");
                break;
            }

            match self.scan_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(scan) => self.process_scan(scan),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Scan channel disconnected, mapping thread exiting");
                    break;
                }
            }
        }
    }

    /// Apply one scan: snapshot, ray-cast free marking, frontier recompute.
    fn process_scan(&mut self, scan: LaserScan) {
        if scan.ranges.is_empty() {
            return;
        }

        // Publish the snapshot first so homing sees the same scan the grid
        // update is based on
        self.state.set_scan(scan.clone());

        let pose = self.state.pose();
        let step = self.grid.resolution();

        for &deg in &self.bearings {
            let reading = scan.ranges[scan_index(deg, scan.ranges.len())];
            let distance = clamp_range(reading, self.range_max);
            let bearing = (deg as f32).to_radians();

            for (x, y) in ray_points(pose, bearing, distance, step) {
                self.grid.update_grid(x, y, CellUpdate::NoObstacle);
            }
        }

        match self.aoif.lock() {
            Ok(mut aoif) => aoif.get_grid_contours(&self.grid, pose.x, pose.y),
            Err(_) => tracing::error!("Frontier finder lock poisoned"),
        }
    }
}

/// Clamp a raw range reading to the sensor's configured maximum. Infinite
/// or NaN readings count as exactly the maximum range.
fn clamp_range(reading: f32, range_max: f32) -> f32 {
    if reading.is_finite() {
        reading.min(range_max)
    } else {
        range_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_reading_clamps_to_max_range() {
        assert_eq!(clamp_range(f32::INFINITY, 8.0), 8.0);
        assert_eq!(clamp_range(f32::NEG_INFINITY, 8.0), 8.0);
        assert_eq!(clamp_range(f32::NAN, 8.0), 8.0);
    }

    #[test]
    fn test_in_range_reading_passes_through() {
        assert_eq!(clamp_range(3.5, 8.0), 3.5);
        assert_eq!(clamp_range(9.2, 8.0), 8.0);
    }
}
