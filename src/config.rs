//! Configuration loading for AnveshaNav

use crate::error::{AnveshaError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct AnveshaConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub laser: LaserConfig,
    #[serde(default)]
    pub frontier: FrontierConfig,
    #[serde(default)]
    pub sequencer: SequencerConfig,
    #[serde(default)]
    pub homing: HomingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub objects: ObjectsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Network connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// KendraIO hub IP address (default: 127.0.0.1 for local mock)
    #[serde(default = "default_hub_ip")]
    pub hub_ip: String,

    /// TCP port number (default: 5600)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Bounded wait for the static map at startup in milliseconds.
    /// Exceeding this is fatal.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_ms: u64,

    /// Bounded wait for a navigation goal acknowledgment in milliseconds
    #[serde(default = "default_goal_wait")]
    pub goal_wait_ms: u64,
}

/// Occupancy grid settings
#[derive(Clone, Debug, Deserialize)]
pub struct GridConfig {
    /// The map counts as fully explored once the unknown-cell proportion
    /// drops below this value
    #[serde(default = "default_explored_threshold")]
    pub explored_threshold: f32,
}

/// Laser sampling settings
#[derive(Clone, Debug, Deserialize)]
pub struct LaserConfig {
    /// Field of view sampled around the forward bearing (degrees)
    #[serde(default = "default_fov_deg")]
    pub fov_deg: u32,

    /// Sample one beam every this many degrees
    #[serde(default = "default_density_deg")]
    pub density_deg: u32,

    /// Maximum sensor range in meters; infinite readings are clamped to this
    #[serde(default = "default_range_max")]
    pub range_max: f32,

    /// Half-width of the forward sector inspected during homing (beams)
    #[serde(default = "default_forward_sector")]
    pub forward_sector: usize,
}

/// Area-of-interest (frontier) detection settings
#[derive(Clone, Debug, Deserialize)]
pub struct FrontierConfig {
    /// Factor relating coarse centroid coordinates to the fine grid
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// Minimum number of cells for a valid frontier cluster
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
}

/// Behaviour sequencing settings
#[derive(Clone, Debug, Deserialize)]
pub struct SequencerConfig {
    /// Tick rate of the behaviour loop (Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,
}

/// Homing behaviour settings
#[derive(Clone, Debug, Deserialize)]
pub struct HomingConfig {
    /// Forward distance below which the object counts as reached (meters)
    #[serde(default = "default_approach_threshold")]
    pub approach_threshold: f32,

    /// Linear velocity while creeping toward the object (m/s)
    #[serde(default = "default_creep_linear_vel")]
    pub creep_linear_vel: f32,
}

/// Idle detection and status reporting settings
#[derive(Clone, Debug, Deserialize)]
pub struct MonitorConfig {
    /// Warn the active behaviour after this long without progress (seconds)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: f32,

    /// Minimum pose displacement to count as progress (meters)
    #[serde(default = "default_min_progress_distance")]
    pub min_progress_distance: f32,

    /// Interval between status log lines (seconds)
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: f32,
}

/// Object detection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ObjectsConfig {
    /// Number of known object classes
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

/// Output configuration
#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    /// Path to save the final grid snapshot (PGM)
    #[serde(default = "default_map_path")]
    pub map_path: String,
}

// Default value functions
fn default_hub_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5600
}
fn default_timeout() -> u64 {
    5000
}
fn default_startup_timeout() -> u64 {
    5000
}
fn default_goal_wait() -> u64 {
    1000
}
fn default_explored_threshold() -> f32 {
    0.05
}
fn default_fov_deg() -> u32 {
    60
}
fn default_density_deg() -> u32 {
    4
}
fn default_range_max() -> f32 {
    8.0
}
fn default_forward_sector() -> usize {
    3
}
fn default_scale() -> f32 {
    4.0
}
fn default_min_cluster_size() -> usize {
    4
}
fn default_rate_hz() -> u32 {
    25
}
fn default_approach_threshold() -> f32 {
    0.25
}
fn default_creep_linear_vel() -> f32 {
    0.1
}
fn default_idle_timeout_secs() -> f32 {
    10.0
}
fn default_min_progress_distance() -> f32 {
    0.10
}
fn default_status_interval_secs() -> f32 {
    3.0
}
fn default_num_classes() -> usize {
    4
}
fn default_map_path() -> String {
    "output/map.pgm".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hub_ip: default_hub_ip(),
            port: default_port(),
            timeout_ms: default_timeout(),
            startup_timeout_ms: default_startup_timeout(),
            goal_wait_ms: default_goal_wait(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            explored_threshold: default_explored_threshold(),
        }
    }
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            fov_deg: default_fov_deg(),
            density_deg: default_density_deg(),
            range_max: default_range_max(),
            forward_sector: default_forward_sector(),
        }
    }
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            min_cluster_size: default_min_cluster_size(),
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
        }
    }
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            approach_threshold: default_approach_threshold(),
            creep_linear_vel: default_creep_linear_vel(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            min_progress_distance: default_min_progress_distance(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            num_classes: default_num_classes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_path: default_map_path(),
        }
    }
}

impl Default for AnveshaConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            grid: GridConfig::default(),
            laser: LaserConfig::default(),
            frontier: FrontierConfig::default(),
            sequencer: SequencerConfig::default(),
            homing: HomingConfig::default(),
            monitor: MonitorConfig::default(),
            objects: ObjectsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AnveshaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnveshaError::Config(format!("Failed to read config file: {}", e)))?;
        let config: AnveshaConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the full address string for connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.hub_ip, self.connection.port)
    }

    /// Sampled beam bearings in degrees, spread across the field of view
    /// around the forward bearing
    pub fn laser_bearings(&self) -> Vec<i32> {
        let half = (self.laser.fov_deg / 2) as i32;
        let step = self.laser.density_deg.max(1) as i32;
        let mut bearings = Vec::new();
        let mut deg = -half;
        while deg < half {
            bearings.push(deg);
            deg += step;
        }
        bearings
    }
}
