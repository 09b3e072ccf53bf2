//! Shared state between the telemetry, mapping, and sequencer threads.
//!
//! Every field has a single designated writer: the telemetry thread owns
//! the pose, the mapping thread owns the laser snapshot, and the found
//! registry is only written through its one-way latch. The active
//! behaviour is the lone multi-writer field and lives behind its own mutex
//! inside the [`Sequencer`](crate::sequencer::Sequencer).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::utils::scan_index;

/// Robot pose in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self { x, y, yaw }
    }
}

/// Atomic wrapper for Pose.
/// Packs x and y into one atomic u64 (each as i32 in mm) and yaw into an
/// atomic u32 as fixed-point, so a reader never sees a half-written pose.
#[derive(Debug)]
pub struct AtomicPose {
    xy: AtomicU64,
    yaw: AtomicU32,
}

impl AtomicPose {
    pub fn new(pose: Pose) -> Self {
        let (xy, yaw) = Self::pack(pose);
        Self {
            xy: AtomicU64::new(xy),
            yaw: AtomicU32::new(yaw),
        }
    }

    fn pack(pose: Pose) -> (u64, u32) {
        let x_mm = (pose.x * 1000.0) as i32;
        let y_mm = (pose.y * 1000.0) as i32;
        let xy = ((x_mm as u64) << 32) | (y_mm as u32 as u64);
        let yaw = (pose.yaw * 10000.0) as i32 as u32;
        (xy, yaw)
    }

    pub fn load(&self, order: Ordering) -> Pose {
        let xy = self.xy.load(order);
        let x_mm = (xy >> 32) as i32;
        let y_mm = xy as i32;
        let yaw_fp = self.yaw.load(order) as i32;

        Pose::new(
            x_mm as f32 / 1000.0,
            y_mm as f32 / 1000.0,
            yaw_fp as f32 / 10000.0,
        )
    }

    pub fn store(&self, pose: Pose, order: Ordering) {
        let (xy, yaw) = Self::pack(pose);
        self.xy.store(xy, order);
        self.yaw.store(yaw, order);
    }
}

/// Most recent laser scan. Replaced wholesale by the mapping thread;
/// stale-but-present reads are acceptable.
#[derive(Clone, Debug)]
pub struct LaserScan {
    /// One range per degree, index 0 = forward bearing, counter-clockwise
    pub ranges: Vec<f32>,
    /// Configured sensor maximum; readings are clamped to this
    pub range_max: f32,
}

impl LaserScan {
    /// Minimum finite range over the forward sector of ±`half_width` beams.
    pub fn forward_min(&self, half_width: usize) -> Option<f32> {
        if self.ranges.is_empty() {
            return None;
        }
        let hw = half_width as i32;
        (-hw..=hw)
            .map(|deg| self.ranges[scan_index(deg, self.ranges.len())])
            .filter(|r| r.is_finite())
            .fold(None, |min, r| match min {
                Some(m) if m <= r => Some(m),
                _ => Some(r),
            })
    }
}

/// Shared state between all threads.
#[derive(Debug)]
pub struct SharedState {
    /// Latest localization estimate (written by the telemetry thread)
    pose: AtomicPose,

    /// Latest laser scan (written by the mapping thread)
    scan: RwLock<Option<LaserScan>>,

    /// One-way found latch per known object class, never reset
    objects_found: Vec<AtomicBool>,

    /// Shutdown signal for graceful termination
    shutdown: AtomicBool,
}

impl SharedState {
    pub fn new(num_object_classes: usize) -> Self {
        Self {
            pose: AtomicPose::new(Pose::default()),
            scan: RwLock::new(None),
            objects_found: (0..num_object_classes).map(|_| AtomicBool::new(false)).collect(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Get the current pose.
    pub fn pose(&self) -> Pose {
        self.pose.load(Ordering::Acquire)
    }

    /// Replace the pose (telemetry thread only).
    pub fn set_pose(&self, pose: Pose) {
        self.pose.store(pose, Ordering::Release);
    }

    /// Clone of the latest scan, if one has ever arrived.
    pub fn scan(&self) -> Option<LaserScan> {
        self.scan.read().ok().and_then(|g| g.clone())
    }

    /// Replace the scan snapshot wholesale (mapping thread only).
    pub fn set_scan(&self, scan: LaserScan) {
        if let Ok(mut guard) = self.scan.write() {
            *guard = Some(scan);
        }
    }

    /// Has this object class been found?
    ///
    /// Unknown class ids report found so stray detections are dropped.
    pub fn is_found(&self, object_type: u32) -> bool {
        match self.objects_found.get(object_type as usize) {
            Some(flag) => flag.load(Ordering::Acquire),
            None => true,
        }
    }

    /// Latch an object class as found. Returns true only on the
    /// false-to-true edge; repeated calls are no-ops and fire no side
    /// effects.
    pub fn mark_found(&self, object_type: u32) -> bool {
        let flag = match self.objects_found.get(object_type as usize) {
            Some(flag) => flag,
            None => {
                tracing::warn!("Ignoring unknown object class {}", object_type);
                return false;
            }
        };
        let newly = !flag.fetch_or(true, Ordering::AcqRel);
        if newly {
            tracing::info!("Object {} found", object_type);
        }
        newly
    }

    /// (found, total) across all known object classes.
    pub fn found_summary(&self) -> (usize, usize) {
        let found = self
            .objects_found
            .iter()
            .filter(|f| f.load(Ordering::Acquire))
            .count();
        (found, self.objects_found.len())
    }

    /// Signal shutdown.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Check if shutdown is signaled.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Ordered world points along a ray from the robot position at bearing
/// `pose.yaw + angle`, stepped at `step`, out to `distance` (exclusive of
/// the endpoint cell, which holds whatever the beam hit).
pub fn ray_points(pose: Pose, angle: f32, distance: f32, step: f32) -> Vec<(f32, f32)> {
    let bearing = pose.yaw + angle;
    let (dy, dx) = bearing.sin_cos();

    let mut points = Vec::new();
    let mut travelled = step;
    while travelled < distance {
        points.push((pose.x + dx * travelled, pose.y + dy * travelled));
        travelled += step;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_pose_round_trip() {
        let pose = AtomicPose::new(Pose::default());
        pose.store(Pose::new(1.234, -5.678, 0.7853), Ordering::Release);

        let read = pose.load(Ordering::Acquire);
        assert!((read.x - 1.234).abs() < 0.002);
        assert!((read.y + 5.678).abs() < 0.002);
        assert!((read.yaw - 0.7853).abs() < 0.001);
    }

    #[test]
    fn test_mark_found_is_idempotent() {
        let state = SharedState::new(4);
        assert!(!state.is_found(2));

        assert!(state.mark_found(2));
        assert!(state.is_found(2));

        // Second call is a no-op and reports no edge
        assert!(!state.mark_found(2));
        assert!(state.is_found(2));
        assert_eq!(state.found_summary(), (1, 4));
    }

    #[test]
    fn test_found_is_monotonic_under_contention() {
        use std::sync::Arc;

        let state = Arc::new(SharedState::new(2));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = Arc::clone(&state);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    state.mark_found(0);
                    assert!(state.is_found(0));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(state.is_found(0));
        assert!(!state.is_found(1));
    }

    #[test]
    fn test_unknown_object_class_reports_found() {
        let state = SharedState::new(2);
        assert!(state.is_found(17));
        assert!(!state.mark_found(17));
    }

    #[test]
    fn test_forward_min_wraps_around_scan() {
        let mut ranges = vec![10.0f32; 360];
        ranges[358] = 0.4;
        ranges[2] = 0.6;
        let scan = LaserScan {
            ranges,
            range_max: 8.0,
        };

        assert_eq!(scan.forward_min(3), Some(0.4));
        // Narrower sector misses the reading at -2 degrees
        assert_eq!(scan.forward_min(1), Some(10.0));
    }

    #[test]
    fn test_forward_min_skips_infinite_readings() {
        let mut ranges = vec![f32::INFINITY; 360];
        ranges[1] = 3.0;
        let scan = LaserScan {
            ranges,
            range_max: 8.0,
        };
        assert_eq!(scan.forward_min(3), Some(3.0));

        let all_inf = LaserScan {
            ranges: vec![f32::INFINITY; 360],
            range_max: 8.0,
        };
        assert_eq!(all_inf.forward_min(3), None);
    }

    #[test]
    fn test_ray_points_ordered_and_bounded() {
        let pose = Pose::new(1.0, 1.0, 0.0);
        let points = ray_points(pose, 0.0, 1.0, 0.2);

        // Steps at 0.2, 0.4, 0.6, 0.8; endpoint excluded
        assert_eq!(points.len(), 4);
        for (i, (x, y)) in points.iter().enumerate() {
            assert!((x - (1.0 + 0.2 * (i + 1) as f32)).abs() < 1e-4);
            assert!((y - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_ray_points_respect_yaw_and_angle() {
        use std::f32::consts::FRAC_PI_2;

        // Yaw and beam angle sum to pointing along +Y
        let pose = Pose::new(0.0, 0.0, FRAC_PI_2 / 2.0);
        let points = ray_points(pose, FRAC_PI_2 / 2.0, 0.5, 0.1);
        assert!(!points.is_empty());
        let (x, y) = points[points.len() - 1];
        assert!(x.abs() < 1e-4);
        assert!(y > 0.3);
    }
}
