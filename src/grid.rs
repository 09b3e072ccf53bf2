//! Occupancy grid with atomic per-cell storage.
//!
//! The grid is built once from the static map delivered at startup and then
//! updated in place by two producers: the pose path marks the robot's
//! current cell, the scan path marks ray-traced cells as free. Cell writes
//! are individually atomic so the frontier finder can scan the grid
//! concurrently without ever observing a torn cell value. Cross-cell
//! staleness is tolerated; a frontier computed against a slightly stale
//! grid is corrected on the next recompute.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::client::proto::kendra::MapData;
use crate::error::{AnveshaError, Result};

/// Classification of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CellState {
    Unknown = 0,
    Free = 1,
    Occupied = 2,
    /// The cell containing the robot's latest pose. Transient, overwritten
    /// on each localization update.
    Current = 3,
}

impl CellState {
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => CellState::Free,
            2 => CellState::Occupied,
            3 => CellState::Current,
            _ => CellState::Unknown,
        }
    }
}

/// Update flag for [`GridMap::update_grid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellUpdate {
    /// Mark the cell containing the robot's pose
    Current,
    /// Mark a ray-traced cell as confirmed free
    NoObstacle,
}

/// Sentinel for "no current cell recorded".
const NO_CURRENT: usize = usize::MAX;

/// Occupancy value at or above which a static map cell counts as occupied.
const STATIC_OCCUPIED: i32 = 50;

/// Discretized occupancy map.
///
/// Coordinate system: cell (gx, gy) covers the world area from
/// `origin + g * resolution` to `origin + (g + 1) * resolution`.
pub struct GridMap {
    cells: Vec<AtomicU8>,
    /// Occupancy retained from the static source map, used by
    /// [`reset_grid`](Self::reset_grid) and to enforce the rule that a
    /// statically occupied cell is never downgraded.
    static_occupied: Vec<bool>,
    width: usize,
    height: usize,
    resolution: f32,
    inv_resolution: f32,
    origin: (f32, f32),
    /// Cells still unknown; kept exact so the explored check is O(1)
    unknown_cells: AtomicUsize,
    current_cell: AtomicUsize,
    explored_threshold: f32,
}

impl GridMap {
    /// Build the grid from the static map delivered at startup.
    pub fn from_map_data(map: &MapData, explored_threshold: f32) -> Result<Self> {
        let width = map.width as usize;
        let height = map.height as usize;
        if width == 0 || height == 0 {
            return Err(AnveshaError::Startup("static map has zero extent".into()));
        }
        if map.cells.len() != width * height {
            return Err(AnveshaError::Startup(format!(
                "static map cell count {} does not match {}x{}",
                map.cells.len(),
                width,
                height
            )));
        }
        if map.resolution <= 0.0 {
            return Err(AnveshaError::Startup(format!(
                "invalid map resolution {}",
                map.resolution
            )));
        }

        let static_occupied: Vec<bool> = map.cells.iter().map(|&v| v >= STATIC_OCCUPIED).collect();
        let unknown = static_occupied.iter().filter(|&&occ| !occ).count();
        let cells = static_occupied
            .iter()
            .map(|&occ| {
                AtomicU8::new(if occ {
                    CellState::Occupied as u8
                } else {
                    CellState::Unknown as u8
                })
            })
            .collect();

        Ok(Self {
            cells,
            static_occupied,
            width,
            height,
            resolution: map.resolution,
            inv_resolution: 1.0 / map.resolution,
            origin: (map.origin_x, map.origin_y),
            unknown_cells: AtomicUsize::new(unknown),
            current_cell: AtomicUsize::new(NO_CURRENT),
            explored_threshold,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Convert world coordinates to a grid cell, or `None` if out of bounds.
    pub fn to_grid(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let gx = ((x - self.origin.0) * self.inv_resolution).floor();
        let gy = ((y - self.origin.1) * self.inv_resolution).floor();
        if gx < 0.0 || gy < 0.0 || gx >= self.width as f32 || gy >= self.height as f32 {
            return None;
        }
        Some((gx as usize, gy as usize))
    }

    /// Convert world coordinates to unclamped fractional grid coordinates.
    pub fn to_grid_f32(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.origin.0) * self.inv_resolution,
            (y - self.origin.1) * self.inv_resolution,
        )
    }

    /// Convert (possibly fractional) grid coordinates to the world position
    /// of the cell center.
    pub fn to_world(&self, gx: f32, gy: f32) -> (f32, f32) {
        (
            self.origin.0 + (gx + 0.5) * self.resolution,
            self.origin.1 + (gy + 0.5) * self.resolution,
        )
    }

    /// Read the state of a cell.
    pub fn get(&self, gx: usize, gy: usize) -> CellState {
        CellState::from_u8(self.cells[gy * self.width + gx].load(Ordering::Relaxed))
    }

    /// Update the cell containing world position (x, y).
    ///
    /// `NoObstacle` promotes unknown cells to free and never downgrades an
    /// occupied cell. `Current` moves the transient robot marker, reverting
    /// the previous marker cell to free.
    pub fn update_grid(&self, x: f32, y: f32, flag: CellUpdate) {
        let (gx, gy) = match self.to_grid(x, y) {
            Some(coord) => coord,
            None => return,
        };
        let idx = gy * self.width + gx;

        match flag {
            CellUpdate::NoObstacle => {
                self.transition(idx, CellState::Unknown, CellState::Free);
            }
            CellUpdate::Current => {
                let prev = self.current_cell.swap(idx, Ordering::AcqRel);
                if prev != NO_CURRENT && prev != idx {
                    self.transition(prev, CellState::Current, CellState::Free);
                }
                self.mark_current(idx);
            }
        }
    }

    /// Atomically replace `from` with `to` at `idx`, keeping the unknown
    /// counter exact.
    fn transition(&self, idx: usize, from: CellState, to: CellState) {
        if self.cells[idx]
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
            && from == CellState::Unknown
        {
            self.unknown_cells.fetch_sub(1, Ordering::AcqRel);
        }
    }

    fn mark_current(&self, idx: usize) {
        let mut old = self.cells[idx].load(Ordering::Acquire);
        loop {
            // Statically occupied cells keep their state even if the pose
            // estimate briefly lands inside one
            if old == CellState::Occupied as u8 {
                return;
            }
            match self.cells[idx].compare_exchange(
                old,
                CellState::Current as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if old == CellState::Unknown as u8 {
                        self.unknown_cells.fetch_sub(1, Ordering::AcqRel);
                    }
                    return;
                }
                Err(actual) => old = actual,
            }
        }
    }

    /// Fraction of cells still unknown.
    pub fn unknown_fraction(&self) -> f32 {
        self.unknown_cells.load(Ordering::Acquire) as f32 / self.cells.len() as f32
    }

    /// True once the unknown-cell proportion drops below the configured
    /// threshold.
    pub fn is_fully_explored(&self) -> bool {
        self.unknown_fraction() < self.explored_threshold
    }

    /// Reinitialize dynamic state from the retained static occupancy array,
    /// preserving statically occupied cells. Called when the map is fully
    /// explored so coverage tracking can resume.
    ///
    /// The unknown counter is adjusted per cell from the swapped-out state
    /// rather than stored wholesale, so decrements from concurrent
    /// [`update_grid`](Self::update_grid) calls are never lost and the
    /// counter stays exact.
    pub fn reset_grid(&self) {
        for (idx, &occ) in self.static_occupied.iter().enumerate() {
            let state = if occ {
                CellState::Occupied
            } else {
                CellState::Unknown
            };
            let prev = self.cells[idx].swap(state as u8, Ordering::AcqRel);
            let was_unknown = prev == CellState::Unknown as u8;
            if !occ && !was_unknown {
                self.unknown_cells.fetch_add(1, Ordering::AcqRel);
            } else if occ && was_unknown {
                self.unknown_cells.fetch_sub(1, Ordering::AcqRel);
            }
        }
        self.current_cell.store(NO_CURRENT, Ordering::Release);
    }

    /// Copy of all cell states for pull-only consumers.
    pub fn snapshot(&self) -> Vec<CellState> {
        self.cells
            .iter()
            .map(|c| CellState::from_u8(c.load(Ordering::Relaxed)))
            .collect()
    }

    /// Build a grid directly from cell states (test fixture).
    #[cfg(test)]
    pub(crate) fn from_states(
        width: usize,
        height: usize,
        resolution: f32,
        explored_threshold: f32,
        states: Vec<CellState>,
    ) -> Self {
        assert_eq!(states.len(), width * height);
        let unknown = states
            .iter()
            .filter(|&&s| s == CellState::Unknown)
            .count();
        Self {
            static_occupied: states.iter().map(|&s| s == CellState::Occupied).collect(),
            cells: states.into_iter().map(|s| AtomicU8::new(s as u8)).collect(),
            width,
            height,
            resolution,
            inv_resolution: 1.0 / resolution,
            origin: (0.0, 0.0),
            unknown_cells: AtomicUsize::new(unknown),
            current_cell: AtomicUsize::new(NO_CURRENT),
            explored_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_map(width: u32, height: u32, occupied: &[(u32, u32)]) -> MapData {
        let mut cells = vec![0i32; (width * height) as usize];
        for &(x, y) in occupied {
            cells[(y * width + x) as usize] = 100;
        }
        MapData {
            width,
            height,
            resolution: 0.2,
            origin_x: -1.0,
            origin_y: -1.0,
            cells,
        }
    }

    #[test]
    fn test_world_grid_round_trip() {
        let grid = GridMap::from_map_data(&test_map(20, 20, &[]), 0.05).unwrap();

        for &(x, y) in &[(0.0f32, 0.0f32), (-0.95, -0.95), (1.43, 0.77), (2.1, 1.9)] {
            let (gx, gy) = grid.to_grid(x, y).unwrap();
            let (wx, wy) = grid.to_world(gx as f32, gy as f32);
            assert!(
                (wx - x).abs() <= grid.resolution() && (wy - y).abs() <= grid.resolution(),
                "round trip for ({}, {}) gave ({}, {})",
                x,
                y,
                wx,
                wy
            );
        }
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let grid = GridMap::from_map_data(&test_map(10, 10, &[]), 0.05).unwrap();
        assert!(grid.to_grid(-5.0, 0.0).is_none());
        assert!(grid.to_grid(0.0, 100.0).is_none());
        // Out-of-bounds updates are ignored
        grid.update_grid(-5.0, 0.0, CellUpdate::NoObstacle);
    }

    #[test]
    fn test_no_obstacle_never_downgrades_occupied() {
        let grid = GridMap::from_map_data(&test_map(10, 10, &[(3, 4)]), 0.05).unwrap();
        let (wx, wy) = grid.to_world(3.0, 4.0);

        grid.update_grid(wx, wy, CellUpdate::NoObstacle);
        assert_eq!(grid.get(3, 4), CellState::Occupied);
    }

    #[test]
    fn test_current_mark_is_transient() {
        let grid = GridMap::from_map_data(&test_map(10, 10, &[]), 0.05).unwrap();
        let (ax, ay) = grid.to_world(2.0, 2.0);
        let (bx, by) = grid.to_world(5.0, 5.0);

        grid.update_grid(ax, ay, CellUpdate::Current);
        assert_eq!(grid.get(2, 2), CellState::Current);

        grid.update_grid(bx, by, CellUpdate::Current);
        assert_eq!(grid.get(5, 5), CellState::Current);
        // Previous marker reverts to free: the robot was there
        assert_eq!(grid.get(2, 2), CellState::Free);
    }

    #[test]
    fn test_explored_threshold_and_reset() {
        let grid = GridMap::from_map_data(&test_map(4, 4, &[(0, 0)]), 0.5).unwrap();
        assert!(!grid.is_fully_explored());

        // Mark all non-occupied cells free
        for gy in 0..4 {
            for gx in 0..4 {
                let (wx, wy) = grid.to_world(gx as f32, gy as f32);
                grid.update_grid(wx, wy, CellUpdate::NoObstacle);
            }
        }
        assert!(grid.unknown_fraction() < f32::EPSILON);
        assert!(grid.is_fully_explored());

        grid.reset_grid();
        assert!(!grid.is_fully_explored());
        assert_eq!(grid.get(0, 0), CellState::Occupied);
        assert_eq!(grid.get(1, 1), CellState::Unknown);
    }

    #[test]
    fn test_unknown_counter_exact_across_concurrent_reset() {
        use std::sync::Arc;

        let grid = Arc::new(GridMap::from_map_data(&test_map(20, 20, &[(0, 0)]), 0.05).unwrap());

        // Ray markers race repeated resets; whatever interleaving happens,
        // the counter must match the actual cell states once both sides
        // quiesce
        let mut handles = Vec::new();
        for thread_id in 0..4 {
            let grid = Arc::clone(&grid);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    let gx = (thread_id * 5 + i % 5) as f32;
                    let gy = (i % 20) as f32;
                    let (wx, wy) = grid.to_world(gx, gy);
                    grid.update_grid(wx, wy, CellUpdate::NoObstacle);
                }
            }));
        }
        for _ in 0..50 {
            grid.reset_grid();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let actual_unknown = grid
            .snapshot()
            .iter()
            .filter(|&&s| s == CellState::Unknown)
            .count();
        let counted = (grid.unknown_fraction() * 400.0).round() as usize;
        assert_eq!(counted, actual_unknown);
    }

    #[test]
    fn test_mismatched_map_rejected() {
        let mut map = test_map(4, 4, &[]);
        map.cells.pop();
        assert!(GridMap::from_map_data(&map, 0.05).is_err());
    }
}
