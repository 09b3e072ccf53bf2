//! Behaviour state machine: Exploration and Homing.
//!
//! Exactly one behaviour is active at a time. The sequencer owns the
//! active instance and drives it once per tick; transitions always build a
//! fresh instance, so no behaviour state survives a switch.

use crate::client::proto::kendra::Detection;
use crate::client::NavService;
use crate::grid::GridMap;
use crate::shared::SharedState;

/// Per-tick view of the frontier finder, copied out of its lock by the
/// sequencer so behaviours never touch the finder directly.
#[derive(Clone, Copy, Debug)]
pub struct FrontierSelection {
    pub closest_area: i32,
    pub cx: f32,
    pub cy: f32,
    /// Factor relating the coarse centroid coordinates to the fine grid
    pub scale: f32,
}

/// Tuning shared by both behaviours, taken from the configuration.
#[derive(Clone, Copy, Debug)]
pub struct BehaviourTuning {
    /// Forward distance below which a homed object counts as reached
    pub approach_threshold: f32,
    /// Linear velocity while creeping toward an object
    pub creep_linear_vel: f32,
    /// Half-width of the forward scan sector inspected during homing
    pub forward_sector: usize,
}

/// Everything a behaviour may read or command during one tick.
pub struct TickContext<'a> {
    pub state: &'a SharedState,
    pub grid: &'a GridMap,
    pub frontier: FrontierSelection,
    pub nav: &'a dyn NavService,
    pub tuning: &'a BehaviourTuning,
}

/// Outcome of one behaviour tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep the current behaviour
    Continue,
    /// Homing reached its object; the sequencer switches back to
    /// exploration
    HomingComplete,
}

/// The active behaviour. Closed set, dispatched exhaustively.
#[derive(Debug)]
pub enum Behaviour {
    Exploration(Exploration),
    Homing(Homing),
}

impl Behaviour {
    pub fn name(&self) -> &'static str {
        match self {
            Behaviour::Exploration(_) => "Exploration",
            Behaviour::Homing(_) => "Homing",
        }
    }

    pub fn act(&mut self, ctx: &TickContext) -> TickOutcome {
        match self {
            Behaviour::Exploration(b) => b.act(ctx),
            Behaviour::Homing(b) => b.act(ctx),
        }
    }

    /// Invoked by the liveness monitor when no progress has been observed
    /// for too long.
    pub fn warn_idle(&mut self) {
        match self {
            Behaviour::Exploration(b) => b.warn_idle(),
            // Homing is driven by live sensor feedback, nothing to resend
            Behaviour::Homing(_) => {}
        }
    }
}

/// Drives the robot toward the nearest area of interest.
#[derive(Debug)]
pub struct Exploration {
    /// Coarse coordinates of the last goal sent
    last_goal: (f32, f32),
    /// Force a resend on the next tick regardless of coordinate equality
    idle_resend: bool,
}

impl Exploration {
    pub fn new() -> Self {
        Self {
            last_goal: (0.0, 0.0),
            idle_resend: false,
        }
    }

    fn act(&mut self, ctx: &TickContext) -> TickOutcome {
        let frontier = &ctx.frontier;
        if frontier.closest_area == -1 {
            // Nothing to explore right now
            return TickOutcome::Continue;
        }

        // Coarse-grained change detection: the candidate only counts as new
        // when both centroid coordinates differ from the last sent goal
        let send = self.idle_resend
            || (frontier.cx != self.last_goal.0 && frontier.cy != self.last_goal.1);
        if !send {
            return TickOutcome::Continue;
        }

        self.idle_resend = false;
        self.last_goal = (frontier.cx, frontier.cy);

        let (wx, wy) = ctx
            .grid
            .to_world(frontier.cx / frontier.scale, frontier.cy / frontier.scale);
        match ctx.nav.send_goal(wx, wy, 0.0) {
            Ok(true) => tracing::info!("Sent goal ({:.2}, {:.2})", wx, wy),
            Ok(false) => tracing::warn!(
                "Goal ({:.2}, {:.2}) not acknowledged in time",
                wx,
                wy
            ),
            Err(e) => tracing::warn!("Failed to send goal: {}", e),
        }

        TickOutcome::Continue
    }

    fn warn_idle(&mut self) {
        tracing::info!("Robot is idle while it is supposed to be exploring");
        self.idle_resend = true;
    }
}

/// Pursues a detected object using live laser feedback.
#[derive(Debug)]
pub struct Homing {
    pub object_type: u32,
    angular_vel: f32,
}

impl Homing {
    pub fn new(object_type: u32) -> Self {
        Self {
            object_type,
            angular_vel: 0.0,
        }
    }

    /// Refresh the steering hint from a newer detection of the same object
    /// class. Does not restart approach progress.
    pub fn set_target(&mut self, detection: &Detection) {
        self.object_type = detection.object_type;
        self.angular_vel = detection.angular_vel;
    }

    fn act(&mut self, ctx: &TickContext) -> TickOutcome {
        // Fail soft until the first scan arrives
        let scan = match ctx.state.scan() {
            Some(scan) => scan,
            None => return TickOutcome::Continue,
        };
        let min_dist = match scan.forward_min(ctx.tuning.forward_sector) {
            Some(dist) => dist,
            None => return TickOutcome::Continue,
        };

        if min_dist >= ctx.tuning.approach_threshold {
            // Still approaching: creep forward with the detector's steering
            if let Err(e) = ctx
                .nav
                .set_velocity(ctx.tuning.creep_linear_vel, self.angular_vel)
            {
                tracing::warn!("Failed to send creep command: {}", e);
            }
            return TickOutcome::Continue;
        }

        if let Err(e) = ctx.nav.set_velocity(0.0, 0.0) {
            tracing::warn!("Failed to send stop command: {}", e);
        }
        ctx.state.mark_found(self.object_type);
        TickOutcome::HomingComplete
    }
}

impl Default for Exploration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockNav;
    use crate::client::proto::kendra::MapData;
    use crate::shared::LaserScan;

    fn test_grid() -> GridMap {
        let map = MapData {
            width: 20,
            height: 20,
            resolution: 0.2,
            origin_x: 0.0,
            origin_y: 0.0,
            cells: vec![0; 400],
        };
        GridMap::from_map_data(&map, 0.05).unwrap()
    }

    fn tuning() -> BehaviourTuning {
        BehaviourTuning {
            approach_threshold: 0.25,
            creep_linear_vel: 0.1,
            forward_sector: 3,
        }
    }

    fn selection(closest_area: i32, cx: f32, cy: f32) -> FrontierSelection {
        FrontierSelection {
            closest_area,
            cx,
            cy,
            scale: 4.0,
        }
    }

    fn forward_scan(dist: f32) -> LaserScan {
        LaserScan {
            ranges: vec![dist; 360],
            range_max: 8.0,
        }
    }

    #[test]
    fn test_exploration_resend_heuristic() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();
        let mut behaviour = Behaviour::Exploration(Exploration::new());

        let mut tick = |frontier: FrontierSelection, b: &mut Behaviour| {
            let ctx = TickContext {
                state: &state,
                grid: &grid,
                frontier,
                nav: &nav,
                tuning: &tuning,
            };
            b.act(&ctx)
        };

        // C1, C1, C2: send, silent, send
        tick(selection(0, 8.0, 12.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 1);
        tick(selection(0, 8.0, 12.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 1);
        tick(selection(0, 16.0, 16.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 2);

        // Identical centroid again, but an idle warning forces a resend
        behaviour.warn_idle();
        tick(selection(0, 16.0, 16.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 3);
        // ...exactly once
        tick(selection(0, 16.0, 16.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 3);
    }

    #[test]
    fn test_exploration_silent_when_only_one_coordinate_changes() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();
        let mut behaviour = Behaviour::Exploration(Exploration::new());

        let mut tick = |frontier: FrontierSelection, b: &mut Behaviour| {
            let ctx = TickContext {
                state: &state,
                grid: &grid,
                frontier,
                nav: &nav,
                tuning: &tuning,
            };
            b.act(&ctx)
        };

        tick(selection(0, 8.0, 12.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 1);

        // A centroid shifted along only one axis does not count as a new
        // candidate; both coordinates must differ
        tick(selection(0, 16.0, 12.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 1);
        tick(selection(0, 8.0, 20.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 1);

        // Both differ: resend
        tick(selection(0, 16.0, 20.0), &mut behaviour);
        assert_eq!(nav.goals().len(), 2);
    }

    #[test]
    fn test_exploration_goal_in_world_coordinates() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();
        let mut behaviour = Behaviour::Exploration(Exploration::new());

        let ctx = TickContext {
            state: &state,
            grid: &grid,
            // Coarse (8, 12) at scale 4 -> fine (2, 3) -> world cell center
            frontier: selection(0, 8.0, 12.0),
            nav: &nav,
            tuning: &tuning,
        };
        behaviour.act(&ctx);

        let goals = nav.goals();
        assert_eq!(goals.len(), 1);
        let (wx, wy, _) = goals[0];
        assert!((wx - 0.5).abs() < 1e-4);
        assert!((wy - 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_exploration_noop_without_candidate() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();
        let mut behaviour = Behaviour::Exploration(Exploration::new());

        let ctx = TickContext {
            state: &state,
            grid: &grid,
            frontier: selection(-1, 0.0, 0.0),
            nav: &nav,
            tuning: &tuning,
        };
        behaviour.act(&ctx);

        assert!(nav.goals().is_empty());
    }

    #[test]
    fn test_homing_completion_sequence() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();

        let mut homing = Homing::new(1);
        homing.set_target(&Detection {
            object_type: 1,
            angular_vel: 0.2,
        });
        let mut behaviour = Behaviour::Homing(homing);

        // Forward distances 0.5, 0.4, 0.2 with threshold 0.25:
        // creep, creep, stop + found + completion signal
        let mut outcomes = Vec::new();
        for dist in [0.5, 0.4, 0.2] {
            state.set_scan(forward_scan(dist));
            let ctx = TickContext {
                state: &state,
                grid: &grid,
                frontier: selection(-1, 0.0, 0.0),
                nav: &nav,
                tuning: &tuning,
            };
            outcomes.push(behaviour.act(&ctx));
        }

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Continue,
                TickOutcome::Continue,
                TickOutcome::HomingComplete
            ]
        );
        assert_eq!(
            nav.velocities(),
            vec![(0.1, 0.2), (0.1, 0.2), (0.0, 0.0)]
        );
        assert!(state.is_found(1));
    }

    #[test]
    fn test_homing_noop_without_scan() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();
        let mut behaviour = Behaviour::Homing(Homing::new(0));

        let ctx = TickContext {
            state: &state,
            grid: &grid,
            frontier: selection(-1, 0.0, 0.0),
            nav: &nav,
            tuning: &tuning,
        };
        assert_eq!(behaviour.act(&ctx), TickOutcome::Continue);
        assert!(nav.velocities().is_empty());
        assert!(!state.is_found(0));
    }

    #[test]
    fn test_homing_set_target_updates_steering() {
        let state = SharedState::new(4);
        let grid = test_grid();
        let nav = MockNav::new();
        let tuning = tuning();

        let mut homing = Homing::new(2);
        homing.set_target(&Detection {
            object_type: 2,
            angular_vel: -0.3,
        });
        let mut behaviour = Behaviour::Homing(homing);

        state.set_scan(forward_scan(1.0));
        let ctx = TickContext {
            state: &state,
            grid: &grid,
            frontier: selection(-1, 0.0, 0.0),
            nav: &nav,
            tuning: &tuning,
        };
        behaviour.act(&ctx);
        assert_eq!(nav.velocities(), vec![(0.1, -0.3)]);
    }
}
