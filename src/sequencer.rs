//! Fixed-rate behaviour sequencing and transition arbitration.
//!
//! The sequencer owns the single active behaviour behind one mutex. The
//! tick loop and the asynchronous detection path both take that mutex, so
//! transitions are atomic: `act` can never run against a half-constructed
//! behaviour and racing transition requests resolve deterministically in
//! arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::behaviour::{
    Behaviour, BehaviourTuning, Exploration, FrontierSelection, Homing, TickContext, TickOutcome,
};
use crate::client::proto::kendra::Detection;
use crate::client::NavService;
use crate::frontier::AreaOfInterestFinder;
use crate::grid::GridMap;
use crate::shared::SharedState;

pub struct Sequencer {
    /// The one multi-writer field: guarded by a single mutex shared by the
    /// tick loop, the detection path, and the idle monitor
    behaviour: Mutex<Behaviour>,
    state: Arc<SharedState>,
    grid: Arc<GridMap>,
    aoif: Arc<Mutex<AreaOfInterestFinder>>,
    nav: Arc<dyn NavService>,
    tuning: BehaviourTuning,
    rate_hz: u32,
    cycles: AtomicU64,
}

impl Sequencer {
    pub fn new(
        state: Arc<SharedState>,
        grid: Arc<GridMap>,
        aoif: Arc<Mutex<AreaOfInterestFinder>>,
        nav: Arc<dyn NavService>,
        tuning: BehaviourTuning,
        rate_hz: u32,
    ) -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::Exploration(Exploration::new())),
            state,
            grid,
            aoif,
            nav,
            tuning,
            rate_hz,
            cycles: AtomicU64::new(0),
        }
    }

    /// Run the behaviour loop at the configured rate until shutdown.
    pub fn run(&self) {
        tracing::info!("Sequencer started at {} Hz", self.rate_hz);
        let tick_interval = Duration::from_secs_f64(1.0 / self.rate_hz.max(1) as f64);

        loop {
            let tick_start = Instant::now();

            if self.state.should_shutdown() {
                tracing::info!("Sequencer shutting down");
                if let Err(e) = self.nav.set_velocity(0.0, 0.0) {
                    tracing::warn!("Failed to send stop command: {}", e);
                }
                break;
            }

            self.tick();

            // Maintain cadence
            let elapsed = tick_start.elapsed();
            if elapsed < tick_interval {
                std::thread::sleep(tick_interval - elapsed);
            }
        }
    }

    /// One behaviour tick: act, then apply any completion transition under
    /// the same lock.
    pub fn tick(&self) {
        let frontier = match self.aoif.lock() {
            Ok(aoif) => FrontierSelection {
                closest_area: aoif.closest_area,
                cx: aoif.closest_cx,
                cy: aoif.closest_cy,
                scale: aoif.scale,
            },
            Err(_) => {
                tracing::error!("Frontier finder lock poisoned, skipping tick");
                return;
            }
        };

        let ctx = TickContext {
            state: &self.state,
            grid: &self.grid,
            frontier,
            nav: self.nav.as_ref(),
            tuning: &self.tuning,
        };

        match self.behaviour.lock() {
            Ok(mut behaviour) => {
                if behaviour.act(&ctx) == TickOutcome::HomingComplete {
                    Self::finished_homing(&mut behaviour);
                }
            }
            Err(_) => {
                tracing::error!("Behaviour lock poisoned, skipping tick");
                return;
            }
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Handle a detection event from the external detector. Called from
    /// the telemetry thread, concurrently with the tick loop.
    pub fn try_to_home(&self, detection: &Detection) {
        // Pursuit must never race queued exploration motion
        if let Err(e) = self.nav.cancel_all_goals() {
            tracing::warn!("Failed to cancel goals: {}", e);
        }

        if self.state.is_found(detection.object_type) {
            return;
        }

        let mut behaviour = match self.behaviour.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!("Behaviour lock poisoned, dropping detection");
                return;
            }
        };

        match &mut *behaviour {
            Behaviour::Exploration(_) => {
                tracing::info!("Homing towards object {}", detection.object_type);
                let mut homing = Homing::new(detection.object_type);
                homing.set_target(detection);
                *behaviour = Behaviour::Homing(homing);
            }
            Behaviour::Homing(homing) if homing.object_type == detection.object_type => {
                // Same object class: refresh steering in place
                homing.set_target(detection);
            }
            Behaviour::Homing(homing) => {
                // No cross-class preemption
                tracing::debug!(
                    "Dropping detection for object {} while homing on {}",
                    detection.object_type,
                    homing.object_type
                );
            }
        }
    }

    /// Switch back to exploration, discarding all homing bookkeeping.
    /// Must run under the behaviour lock.
    fn finished_homing(behaviour: &mut Behaviour) {
        tracing::info!("Homing finished, resuming exploration");
        *behaviour = Behaviour::Exploration(Exploration::new());
    }

    /// Forward an idle warning from the liveness monitor to the active
    /// behaviour.
    pub fn warn_idle(&self) {
        if let Ok(mut behaviour) = self.behaviour.lock() {
            behaviour.warn_idle();
        }
    }

    /// Completed tick count.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Name of the active behaviour, for status reporting.
    pub fn behaviour_name(&self) -> &'static str {
        match self.behaviour.lock() {
            Ok(behaviour) => behaviour.name(),
            Err(_) => "unknown",
        }
    }
}
