//! Area-of-interest detection for autonomous exploration.
//!
//! Scans the occupancy grid for boundary cells (unknown cells adjacent to
//! confirmed free space), clusters them with a flood fill, and selects the
//! cluster whose centroid is closest to the robot as the next exploration
//! target. Centroids are reported in a coarse coordinate system related to
//! the fine grid by a configured scale factor.

use std::collections::VecDeque;

use crate::grid::{CellState, GridMap};

/// A frontier cluster: a connected group of unexplored cells bordering
/// known free space.
#[derive(Clone, Debug)]
pub struct AreaOfInterest {
    /// Centroid in coarse coordinates
    pub cx: f32,
    /// Centroid in coarse coordinates
    pub cy: f32,
    /// Number of cells in the cluster
    pub size: usize,
}

/// Recomputes candidate frontier clusters and tracks the current best one.
pub struct AreaOfInterestFinder {
    /// Factor relating coarse centroid coordinates to the fine grid
    pub scale: f32,
    /// Clusters below this size are noise and dropped
    min_cluster_size: usize,
    /// Surviving clusters from the last recompute, in scan order
    pub areas: Vec<AreaOfInterest>,
    /// Index of the closest cluster, or -1 when there is no candidate and
    /// the map counts as explored
    pub closest_area: i32,
    /// Winning centroid in coarse coordinates
    pub closest_cx: f32,
    /// Winning centroid in coarse coordinates
    pub closest_cy: f32,
}

impl AreaOfInterestFinder {
    pub fn new(scale: f32, min_cluster_size: usize) -> Self {
        Self {
            scale,
            min_cluster_size,
            areas: Vec::new(),
            closest_area: -1,
            closest_cx: 0.0,
            closest_cy: 0.0,
        }
    }

    /// Recompute frontier clusters and select the one closest to the robot
    /// position (px, py) in world coordinates.
    ///
    /// Ties are broken by lowest cluster index so the selection is
    /// deterministic for a given grid snapshot.
    pub fn get_grid_contours(&mut self, grid: &GridMap, px: f32, py: f32) {
        let snapshot = grid.snapshot();
        let width = grid.width();
        let height = grid.height();

        let boundary = find_boundary_cells(&snapshot, width, height);
        let clusters = cluster_cells(&boundary, width, height);

        self.areas = clusters
            .into_iter()
            .filter(|cluster| cluster.len() >= self.min_cluster_size)
            .map(|cluster| {
                let size = cluster.len();
                let sum_x: usize = cluster.iter().map(|&idx| idx % width).sum();
                let sum_y: usize = cluster.iter().map(|&idx| idx / width).sum();
                AreaOfInterest {
                    cx: sum_x as f32 / size as f32 * self.scale,
                    cy: sum_y as f32 / size as f32 * self.scale,
                    size,
                }
            })
            .collect();

        let (rx, ry) = grid.to_grid_f32(px, py);
        let (rx, ry) = (rx * self.scale, ry * self.scale);

        self.closest_area = -1;
        let mut best = f32::INFINITY;
        for (i, area) in self.areas.iter().enumerate() {
            let dist = (area.cx - rx).hypot(area.cy - ry);
            if dist < best {
                best = dist;
                self.closest_area = i as i32;
                self.closest_cx = area.cx;
                self.closest_cy = area.cy;
            }
        }
    }
}

/// Find all boundary cells: unknown cells with a 4-connected free (or
/// robot-occupied) neighbour. Returned as indices into the snapshot.
fn find_boundary_cells(snapshot: &[CellState], width: usize, height: usize) -> Vec<bool> {
    let mut boundary = vec![false; snapshot.len()];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if snapshot[idx] != CellState::Unknown {
                continue;
            }

            let mut neighbours = [None; 4];
            if x > 0 {
                neighbours[0] = Some(idx - 1);
            }
            if x + 1 < width {
                neighbours[1] = Some(idx + 1);
            }
            if y > 0 {
                neighbours[2] = Some(idx - width);
            }
            if y + 1 < height {
                neighbours[3] = Some(idx + width);
            }

            boundary[idx] = neighbours.iter().flatten().any(|&n| {
                matches!(snapshot[n], CellState::Free | CellState::Current)
            });
        }
    }

    boundary
}

/// Cluster boundary cells with an 8-connected BFS flood fill. Clusters come
/// out in row-major scan order of their first cell.
fn cluster_cells(boundary: &[bool], width: usize, height: usize) -> Vec<Vec<usize>> {
    let mut visited = vec![false; boundary.len()];
    let mut clusters = Vec::new();

    for start in 0..boundary.len() {
        if !boundary[start] || visited[start] {
            continue;
        }

        let mut cluster = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[start] = true;

        while let Some(idx) = queue.pop_front() {
            cluster.push(idx);

            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                        continue;
                    }
                    let nidx = ny as usize * width + nx as usize;
                    if boundary[nidx] && !visited[nidx] {
                        visited[nidx] = true;
                        queue.push_back(nidx);
                    }
                }
            }
        }

        clusters.push(cluster);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a grid from an ASCII sketch: '#' occupied, '.' free,
    /// '?' unknown. Row 0 of the sketch is grid row 0 (y = 0).
    fn grid_from_sketch(rows: &[&str]) -> GridMap {
        let height = rows.len();
        let width = rows[0].len();
        let mut states = Vec::with_capacity(width * height);
        for row in rows {
            assert_eq!(row.len(), width);
            for ch in row.chars() {
                states.push(match ch {
                    '#' => CellState::Occupied,
                    '.' => CellState::Free,
                    _ => CellState::Unknown,
                });
            }
        }
        GridMap::from_states(width, height, 1.0, 0.05, states)
    }

    #[test]
    fn test_nearest_cluster_wins() {
        // Two frontier clusters: one around (2, 3) with 5 cells, a smaller
        // one around (10, 1) with 2 cells. Robot sits near (2, 4).
        let grid = grid_from_sketch(&[
            "............",
            "..........??",
            "............",
            "?????.......",
            "............",
            "............",
        ]);
        let mut aoif = AreaOfInterestFinder::new(1.0, 2);

        // Robot at world (2.5, 4.5) -> fine grid (2.5, 4.5)
        aoif.get_grid_contours(&grid, 2.5, 4.5);

        // Scan order finds the small cluster (row 1) first, so the winner
        // sits at index 1
        assert_eq!(aoif.areas.len(), 2);
        assert_eq!(aoif.closest_area, 1);
        assert_eq!(aoif.areas[1].size, 5);
        assert_eq!(aoif.areas[0].size, 2);
        // Centroid of cells (0..5, 3) is (2, 3)
        assert!((aoif.closest_cx - 2.0).abs() < 1e-4);
        assert!((aoif.closest_cy - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_cluster_set_yields_sentinel() {
        let grid = grid_from_sketch(&["....", "....", "....", "...."]);
        let mut aoif = AreaOfInterestFinder::new(1.0, 2);

        aoif.get_grid_contours(&grid, 1.0, 1.0);

        assert_eq!(aoif.closest_area, -1);
        assert!(aoif.areas.is_empty());
    }

    #[test]
    fn test_small_clusters_filtered_as_noise() {
        // Single unknown cell adjacent to free space
        let grid = grid_from_sketch(&["....", ".?..", "....", "...."]);
        let mut aoif = AreaOfInterestFinder::new(1.0, 3);

        aoif.get_grid_contours(&grid, 0.5, 0.5);

        assert_eq!(aoif.closest_area, -1);
    }

    #[test]
    fn test_interior_unknown_without_free_neighbour_ignored() {
        // Unknown region fully surrounded by occupied cells is unreachable
        // and must not produce a frontier
        let grid = grid_from_sketch(&[
            ".....",
            ".###.",
            ".#?#.",
            ".###.",
            ".....",
        ]);
        let mut aoif = AreaOfInterestFinder::new(1.0, 1);

        aoif.get_grid_contours(&grid, 0.5, 0.5);

        assert_eq!(aoif.closest_area, -1);
    }

    #[test]
    fn test_centroid_reported_in_coarse_coordinates() {
        let grid = grid_from_sketch(&[
            "......",
            "......",
            "??....",
            "??....",
        ]);
        let mut aoif = AreaOfInterestFinder::new(4.0, 2);

        aoif.get_grid_contours(&grid, 4.0, 0.5);

        assert_eq!(aoif.closest_area, 0);
        // Boundary cells are (0,2), (1,2), (1,3); fine centroid (2/3, 7/3)
        // scaled by 4
        assert!((aoif.closest_cx - 8.0 / 3.0).abs() < 1e-4);
        assert!((aoif.closest_cy - 28.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_tie_broken_by_lowest_index() {
        // Two identical clusters exactly equidistant from the robot
        let grid = grid_from_sketch(&[
            "?...?",
            "?...?",
            ".....",
        ]);
        let mut aoif = AreaOfInterestFinder::new(1.0, 2);

        // Robot centered between both clusters; centroids are at integer
        // x offsets so the distances compare exactly equal
        aoif.get_grid_contours(&grid, 2.0, 2.5);

        assert!(aoif.areas.len() >= 2);
        assert_eq!(aoif.closest_area, 0);
    }
}
