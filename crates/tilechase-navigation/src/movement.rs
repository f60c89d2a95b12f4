//! Step-by-step path following.
//!
//! A [`MovementController`] moves one agent towards a (possibly moving) goal
//! one cell at a time. It never interpolates positions itself: each step hands
//! the caller a [`StepCommand`] with a target and a duration, and the caller
//! reports back through [`MovementController::step`] once the agent has
//! arrived. Every command carries a [`StepTicket`]; completions for any ticket
//! other than the one in flight are ignored, which is how cancelled
//! interpolations are kept from advancing the agent.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::astar::{Path, PathPlanner};
use crate::error::NavigationError;
use crate::map::{CoordinateTransformer, Grid, GridPoint, WorldPoint};

/// Discrete facing used to pick a walk animation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementState {
    /// Not moving.
    #[default]
    Idle,
    /// Moving towards +y.
    Up,
    /// Moving towards -y.
    Down,
    /// Moving towards -x.
    Left,
    /// Moving towards +x.
    Right,
}

impl MovementState {
    /// Derives the facing for a step of `(dx, dy)`.
    ///
    /// Horizontal movement wins on diagonal steps, so exactly one direction
    /// (or `Idle`) is ever reported.
    pub fn from_delta(dx: f32, dy: f32) -> Self {
        if dx > 0.0 {
            MovementState::Right
        } else if dx < 0.0 {
            MovementState::Left
        } else if dy > 0.0 {
            MovementState::Up
        } else if dy < 0.0 {
            MovementState::Down
        } else {
            MovementState::Idle
        }
    }

    /// Derives the facing for a step from `from` to `to`.
    pub fn between(from: &WorldPoint, to: &WorldPoint) -> Self {
        Self::from_delta(to.x - from.x, to.y - from.y)
    }

    /// Name of the animation clip for this state.
    pub fn clip_name(self) -> &'static str {
        match self {
            MovementState::Idle => "Idle",
            MovementState::Up => "WalkUp",
            MovementState::Down => "WalkDown",
            MovementState::Left => "WalkLeft",
            MovementState::Right => "WalkRight",
        }
    }

    /// Returns true for every state except `Idle`.
    pub fn is_moving(self) -> bool {
        self != MovementState::Idle
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clip_name())
    }
}

/// Lifecycle of a controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementPhase {
    /// No pursuit in progress.
    #[default]
    Idle,
    /// A step has been issued and its completion is awaited.
    Moving,
    /// The in-flight step was cancelled and can be resumed.
    Stopped,
}

/// Source of the pursuit goal, read on every replan.
pub trait GoalProvider {
    /// Current world position of the goal.
    fn goal_position(&self) -> WorldPoint;
}

impl<F> GoalProvider for F
where
    F: Fn() -> WorldPoint,
{
    fn goal_position(&self) -> WorldPoint {
        self()
    }
}

impl GoalProvider for WorldPoint {
    fn goal_position(&self) -> WorldPoint {
        *self
    }
}

/// Receives the facing after every step, stop, and resume.
pub trait AnimationSink {
    /// Called with the state the agent should now be animated in.
    fn play(&mut self, state: MovementState);
}

impl<F> AnimationSink for F
where
    F: FnMut(MovementState),
{
    fn play(&mut self, state: MovementState) {
        self(state)
    }
}

/// Sink for agents without animation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnimation;

impl AnimationSink for NoAnimation {
    fn play(&mut self, _state: MovementState) {}
}

/// Identifies one issued step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepTicket(u64);

/// Instruction to move the agent to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCommand {
    /// World position to interpolate to.
    pub target: WorldPoint,
    /// Time the interpolation should take.
    pub duration: Duration,
    /// Facing for the duration of the step.
    pub facing: MovementState,
    /// Ticket to pass back to [`MovementController::step`] on arrival.
    pub ticket: StepTicket,
}

/// Result of starting or advancing a pursuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Interpolate as instructed, then report completion.
    Move(StepCommand),
    /// No further step: the agent reached the goal or no path exists.
    Idle,
    /// The completion was stale or the controller was not moving.
    Ignored,
}

impl StepOutcome {
    /// Gets the command if this outcome is a move.
    pub fn command(&self) -> Option<&StepCommand> {
        match self {
            StepOutcome::Move(command) => Some(command),
            StepOutcome::Idle | StepOutcome::Ignored => None,
        }
    }
}

/// Tuning for a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementSettings {
    /// Duration of a single cell-to-cell step.
    pub step_duration: Duration,
    /// Target cell centers instead of cell corners.
    pub centered: bool,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            step_duration: Duration::from_millis(500),
            centered: true,
        }
    }
}

/// Moves one agent along freshly planned paths, one cell per step.
pub struct MovementController<G, A = NoAnimation> {
    grid: Arc<Grid>,
    transformer: CoordinateTransformer,
    planner: PathPlanner,
    goal: G,
    sink: A,
    settings: MovementSettings,
    phase: MovementPhase,
    facing: MovementState,
    /// Last position the agent is known to have reached.
    position: WorldPoint,
    path: Option<Path>,
    pending: Option<StepCommand>,
    next_ticket: u64,
}

impl<G: GoalProvider, A: AnimationSink> MovementController<G, A> {
    /// Creates an idle controller.
    pub fn new(
        grid: Arc<Grid>,
        transformer: CoordinateTransformer,
        planner: PathPlanner,
        goal: G,
        sink: A,
        settings: MovementSettings,
    ) -> Self {
        Self {
            grid,
            transformer,
            planner,
            goal,
            sink,
            settings,
            phase: MovementPhase::Idle,
            facing: MovementState::Idle,
            position: WorldPoint::default(),
            path: None,
            pending: None,
            next_ticket: 0,
        }
    }

    /// Gets the lifecycle phase.
    pub fn phase(&self) -> MovementPhase {
        self.phase
    }

    /// Gets the current facing.
    pub fn facing(&self) -> MovementState {
        self.facing
    }

    /// Gets the last position the agent reached.
    pub fn position(&self) -> WorldPoint {
        self.position
    }

    /// Gets the path from the most recent plan.
    pub fn current_path(&self) -> Option<&[GridPoint]> {
        self.path.as_deref()
    }

    /// Gets the step awaiting completion, if any.
    pub fn pending(&self) -> Option<&StepCommand> {
        self.pending.as_ref()
    }

    /// Starts a pursuit from `start`.
    ///
    /// Any step issued by an earlier pursuit becomes stale. The first facing
    /// is taken from `start` to the first target, which need not match the
    /// direction between the first two path cells when `start` is off-center.
    ///
    /// # Errors
    /// * `NavigationError::InvalidPosition` - if `start` is not finite.
    pub fn begin(&mut self, start: WorldPoint) -> Result<StepOutcome, NavigationError> {
        if !start.is_finite() {
            return Err(NavigationError::InvalidPosition(
                "Start position must be finite",
            ));
        }
        debug!(%start, "Beginning pursuit");
        self.position = start;
        self.pending = None;
        Ok(self.advance())
    }

    /// Reports that the step identified by `ticket` has completed, and plans
    /// the next one.
    ///
    /// Completions for cancelled or superseded steps return
    /// [`StepOutcome::Ignored`] and leave the controller untouched.
    pub fn step(&mut self, ticket: StepTicket) -> StepOutcome {
        if self.phase != MovementPhase::Moving {
            debug!(?ticket, phase = ?self.phase, "Ignoring completion while not moving");
            return StepOutcome::Ignored;
        }
        match self.pending {
            Some(command) if command.ticket == ticket => {
                self.position = command.target;
                self.pending = None;
                self.advance()
            }
            _ => {
                debug!(?ticket, "Ignoring stale completion");
                StepOutcome::Ignored
            }
        }
    }

    /// Cancels the step in flight and faces `Idle`. Does nothing unless moving.
    pub fn stop(&mut self) {
        if self.phase != MovementPhase::Moving {
            return;
        }
        debug!(position = %self.position, "Stopping pursuit");
        self.phase = MovementPhase::Stopped;
        self.set_facing(MovementState::Idle);
    }

    /// Re-issues the step cancelled by [`stop`](Self::stop) without
    /// replanning. Returns `None` unless stopped.
    ///
    /// The re-issued command has a new ticket; the cancelled one stays stale.
    pub fn resume(&mut self) -> Option<StepCommand> {
        if self.phase != MovementPhase::Stopped {
            return None;
        }
        let Some(mut command) = self.pending else {
            self.phase = MovementPhase::Idle;
            return None;
        };
        command.ticket = self.issue_ticket();
        self.pending = Some(command);
        self.phase = MovementPhase::Moving;
        self.set_facing(command.facing);
        debug!(target = %command.target, "Resuming pursuit");
        Some(command)
    }

    /// Replans from the current position and issues the next step.
    fn advance(&mut self) -> StepOutcome {
        let goal = self.goal.goal_position();
        if !goal.is_finite() {
            warn!(%goal, "Goal position is not finite");
            self.path = None;
            return self.go_idle();
        }

        let start_cell = self.transformer.world_to_cell(&self.position);
        let goal_cell = self.transformer.world_to_cell(&goal);
        self.path = self.planner.find_path(&self.grid, start_cell, goal_cell);

        let Some((from, to)) = self
            .path
            .as_ref()
            .filter(|path| path.len() >= 2)
            .map(|path| (path[0], path[1]))
        else {
            debug!(%start_cell, %goal_cell, found = self.path.is_some(), "No step to take");
            return self.go_idle();
        };

        let next = self.transformer.cell_to_world(to, self.settings.centered);
        let facing = MovementState::between(&self.position, &next);
        let command = StepCommand {
            target: WorldPoint::with_z(next.x, next.y, self.position.z),
            duration: self.settings.step_duration,
            facing,
            ticket: self.issue_ticket(),
        };

        debug!(from = %from, to = %to, %goal_cell, %facing, "Issuing step");
        self.pending = Some(command);
        self.phase = MovementPhase::Moving;
        self.set_facing(facing);
        StepOutcome::Move(command)
    }

    fn go_idle(&mut self) -> StepOutcome {
        self.pending = None;
        self.phase = MovementPhase::Idle;
        self.set_facing(MovementState::Idle);
        StepOutcome::Idle
    }

    fn set_facing(&mut self, facing: MovementState) {
        self.facing = facing;
        self.sink.play(facing);
    }

    fn issue_ticket(&mut self) -> StepTicket {
        self.next_ticket += 1;
        StepTicket(self.next_ticket)
    }
}

impl<G, A> fmt::Debug for MovementController<G, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovementController")
            .field("phase", &self.phase)
            .field("facing", &self.facing)
            .field("position", &self.position)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::{DiagonalMovement, PlannerOptions};
    use crate::map::{GridBuilder, TileLayerData};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const TILE: f32 = 32.0;

    fn world(rows: &[&str]) -> (Arc<Grid>, CoordinateTransformer) {
        let layer = TileLayerData::from_text_rows(rows, ".", TILE, TILE, WorldPoint::new(-64.0, -64.0));
        let (grid, transformer) = GridBuilder::from_layer(&layer).unwrap();
        (Arc::new(grid), transformer)
    }

    fn gap_world() -> (Arc<Grid>, CoordinateTransformer) {
        world(&[".....", ".....", "##.##", ".....", "....."])
    }

    fn center(t: &CoordinateTransformer, x: i32, y: i32) -> WorldPoint {
        t.cell_to_world(GridPoint::new(x, y), true)
    }

    type Log = Rc<RefCell<Vec<MovementState>>>;

    fn recording_controller<G: GoalProvider>(
        grid: Arc<Grid>,
        transformer: CoordinateTransformer,
        goal: G,
    ) -> (MovementController<G, impl AnimationSink>, Log) {
        let log: Log = Rc::default();
        let sink_log = Rc::clone(&log);
        let controller = MovementController::new(
            grid,
            transformer,
            PathPlanner::default(),
            goal,
            move |state| sink_log.borrow_mut().push(state),
            MovementSettings::default(),
        );
        (controller, log)
    }

    #[test]
    fn test_direction_derivation() {
        let origin = WorldPoint::new(0.0, 0.0);
        assert_eq!(MovementState::between(&origin, &WorldPoint::new(1.0, 0.0)), MovementState::Right);
        assert_eq!(MovementState::between(&origin, &WorldPoint::new(0.0, 1.0)), MovementState::Up);
        assert_eq!(MovementState::between(&origin, &WorldPoint::new(-1.0, 0.0)), MovementState::Left);
        assert_eq!(MovementState::between(&origin, &WorldPoint::new(0.0, -1.0)), MovementState::Down);
        assert_eq!(MovementState::between(&origin, &origin), MovementState::Idle);
    }

    #[test]
    fn test_diagonal_prefers_horizontal() {
        assert_eq!(MovementState::from_delta(1.0, 1.0), MovementState::Right);
        assert_eq!(MovementState::from_delta(-1.0, -1.0), MovementState::Left);
        assert_eq!(MovementState::from_delta(-1.0, 1.0), MovementState::Left);
    }

    #[test]
    fn test_clip_names() {
        assert_eq!(MovementState::Idle.clip_name(), "Idle");
        assert_eq!(MovementState::Right.to_string(), "WalkRight");
        assert!(!MovementState::Idle.is_moving());
        assert!(MovementState::Down.is_moving());
    }

    #[test]
    fn test_begin_issues_next_cell() {
        let (grid, t) = gap_world();
        let goal = center(&t, 4, 4);
        let (mut controller, log) = recording_controller(grid, t, goal);

        let outcome = controller.begin(center(&t, 0, 0)).unwrap();
        let command = *outcome.command().expect("first step");

        let next = t.world_to_cell(&command.target);
        assert!(next == GridPoint::new(1, 0) || next == GridPoint::new(0, 1));
        assert_eq!(command.target, center(&t, next.x, next.y));
        assert_eq!(command.duration, Duration::from_millis(500));
        assert_eq!(controller.phase(), MovementPhase::Moving);
        assert_eq!(controller.facing(), command.facing);
        assert!(command.facing == MovementState::Right || command.facing == MovementState::Up);
        assert_eq!(*log.borrow(), vec![command.facing]);
    }

    #[test]
    fn test_first_facing_follows_actual_start() {
        let (grid, t) = world(&["...", "...", "..."]);
        let goal = center(&t, 0, 2);

        // Inside cell (0,0) but right of its center; the step goes up-left.
        let start = WorldPoint::new(-36.0, -48.0);
        let (mut controller, log) = recording_controller(Arc::clone(&grid), t, goal);
        let command = *controller.begin(start).unwrap().command().unwrap();
        assert_eq!(command.target, center(&t, 0, 1));
        assert_eq!(command.facing, MovementState::between(&start, &command.target));
        assert_eq!(command.facing, MovementState::Left);
        assert_eq!(*log.borrow(), vec![MovementState::Left]);

        // Once on the target, the next step faces along the path again.
        let next = *controller.step(command.ticket).command().unwrap();
        assert_eq!(next.facing, MovementState::Up);

        let (mut centered, _) = recording_controller(grid, t, goal);
        let command = *centered.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        assert_eq!(command.facing, MovementState::Up);
    }

    #[test]
    fn test_pursuit_runs_to_goal_through_gap() {
        let (grid, t) = gap_world();
        let goal = center(&t, 4, 4);
        let (mut controller, log) = recording_controller(grid, t, goal);

        let mut visited = vec![t.world_to_cell(&center(&t, 0, 0))];
        let mut outcome = controller.begin(center(&t, 0, 0)).unwrap();
        while let StepOutcome::Move(command) = outcome {
            visited.push(t.world_to_cell(&command.target));
            outcome = controller.step(command.ticket);
            assert!(visited.len() < 50, "pursuit should terminate");
        }

        assert_eq!(outcome, StepOutcome::Idle);
        assert_eq!(visited.len(), 9, "8 orthogonal steps from (0,0) to (4,4)");
        assert!(visited.contains(&GridPoint::new(2, 2)));
        assert_eq!(*visited.last().unwrap(), GridPoint::new(4, 4));
        assert_eq!(controller.phase(), MovementPhase::Idle);
        assert_eq!(controller.facing(), MovementState::Idle);
        assert_eq!(log.borrow().last(), Some(&MovementState::Idle));
        assert_eq!(controller.current_path(), Some(&[GridPoint::new(4, 4)][..]));
    }

    #[test]
    fn test_trivial_path_goes_idle() {
        let (grid, t) = gap_world();
        let here = center(&t, 3, 3);
        let (mut controller, log) = recording_controller(grid, t, here);

        let outcome = controller.begin(WorldPoint::new(here.x + 5.0, here.y - 5.0)).unwrap();
        assert_eq!(outcome, StepOutcome::Idle);
        assert!(controller.pending().is_none());
        assert_eq!(controller.phase(), MovementPhase::Idle);
        assert_eq!(*log.borrow(), vec![MovementState::Idle]);
    }

    #[test]
    fn test_unreachable_goal_goes_idle() {
        let (grid, t) = world(&[".....", ".###.", ".#.#.", ".###.", "....."]);
        let (mut controller, _log) = recording_controller(grid, t, center(&t, 2, 2));

        let outcome = controller.begin(center(&t, 0, 0)).unwrap();
        assert_eq!(outcome, StepOutcome::Idle);
        assert_eq!(controller.facing(), MovementState::Idle);
        assert!(controller.current_path().is_none());
    }

    #[test]
    fn test_goal_outside_layer_goes_idle() {
        let (grid, t) = gap_world();
        let (mut controller, _log) = recording_controller(grid, t, WorldPoint::new(5000.0, 0.0));
        assert_eq!(controller.begin(center(&t, 0, 0)).unwrap(), StepOutcome::Idle);
    }

    #[test]
    fn test_invalid_start() {
        let (grid, t) = gap_world();
        let (mut controller, _log) = recording_controller(grid, t, center(&t, 4, 4));
        assert!(matches!(
            controller.begin(WorldPoint::new(f32::NAN, 0.0)),
            Err(NavigationError::InvalidPosition(_))
        ));
        assert_eq!(controller.phase(), MovementPhase::Idle);
    }

    #[test]
    fn test_stale_completion_after_stop_is_ignored() {
        let (grid, t) = gap_world();
        let (mut controller, log) = recording_controller(grid, t, center(&t, 4, 4));

        let first = *controller.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        controller.stop();
        assert_eq!(controller.phase(), MovementPhase::Stopped);
        assert_eq!(controller.facing(), MovementState::Idle);
        assert_eq!(log.borrow().last(), Some(&MovementState::Idle));

        // The cancelled interpolation reports completion anyway.
        assert_eq!(controller.step(first.ticket), StepOutcome::Ignored);
        assert_eq!(controller.phase(), MovementPhase::Stopped);
        assert_eq!(controller.position(), center(&t, 0, 0));

        let resumed = controller.resume().expect("resume re-issues the step");
        assert_eq!(resumed.target, first.target);
        assert_eq!(resumed.facing, first.facing);
        assert_ne!(resumed.ticket, first.ticket);
        assert_eq!(controller.facing(), first.facing);

        // Still stale after resuming.
        assert_eq!(controller.step(first.ticket), StepOutcome::Ignored);
        assert!(matches!(controller.step(resumed.ticket), StepOutcome::Move(_)));
        assert_eq!(controller.position(), first.target);
    }

    #[test]
    fn test_stop_and_resume_are_noops_when_idle() {
        let (grid, t) = gap_world();
        let (mut controller, log) = recording_controller(grid, t, center(&t, 4, 4));

        controller.stop();
        assert_eq!(controller.phase(), MovementPhase::Idle);
        assert!(controller.resume().is_none());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_wrong_ticket_is_ignored() {
        let (grid, t) = gap_world();
        let (mut controller, _log) = recording_controller(grid, t, center(&t, 4, 4));

        let first = *controller.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        let second = *controller.step(first.ticket).command().unwrap();
        assert_eq!(controller.step(first.ticket), StepOutcome::Ignored);
        assert_eq!(controller.pending(), Some(&second));
    }

    #[test]
    fn test_begin_again_supersedes_previous_step() {
        let (grid, t) = gap_world();
        let (mut controller, _log) = recording_controller(grid, t, center(&t, 4, 4));

        let old = *controller.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        let new = *controller.begin(center(&t, 4, 0)).unwrap().command().unwrap();
        assert_eq!(controller.step(old.ticket), StepOutcome::Ignored);
        assert_eq!(controller.pending(), Some(&new));
        let next = t.world_to_cell(&new.target);
        assert!(next == GridPoint::new(3, 0) || next == GridPoint::new(4, 1));
    }

    #[test]
    fn test_replans_towards_moving_goal() {
        let (grid, t) = world(&[".....", ".....", "....."]);
        let goal = Rc::new(Cell::new(center(&t, 4, 1)));
        let goal_reader = Rc::clone(&goal);
        let (mut controller, _log) =
            recording_controller(grid, t, move || goal_reader.get());

        let first = *controller.begin(center(&t, 2, 1)).unwrap().command().unwrap();
        assert_eq!(t.world_to_cell(&first.target), GridPoint::new(3, 1));
        assert_eq!(first.facing, MovementState::Right);

        goal.set(center(&t, 0, 1));
        let second = *controller.step(first.ticket).command().unwrap();
        assert_eq!(t.world_to_cell(&second.target), GridPoint::new(2, 1));
        assert_eq!(second.facing, MovementState::Left);
    }

    #[test]
    fn test_vertical_steps_face_up_and_down() {
        let (grid, t) = world(&[".", ".", "."]);
        let (mut up, _) = recording_controller(Arc::clone(&grid), t, center(&t, 0, 2));
        let step = *up.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        assert_eq!(step.facing, MovementState::Up);

        let (mut down, _) = recording_controller(grid, t, center(&t, 0, 0));
        let step = *down.begin(center(&t, 0, 2)).unwrap().command().unwrap();
        assert_eq!(step.facing, MovementState::Down);
    }

    #[test]
    fn test_z_is_preserved() {
        let (grid, t) = world(&["..."]);
        let (mut controller, _log) = recording_controller(grid, t, center(&t, 2, 0));
        let start = center(&t, 0, 0);
        let command = *controller
            .begin(WorldPoint::with_z(start.x, start.y, 3.5))
            .unwrap()
            .command()
            .unwrap();
        assert_eq!(command.target.z, 3.5);
    }

    #[test]
    fn test_corner_targets_when_not_centered() {
        let (grid, t) = world(&["..."]);
        let mut controller = MovementController::new(
            grid,
            t,
            PathPlanner::default(),
            center(&t, 2, 0),
            NoAnimation,
            MovementSettings {
                step_duration: Duration::from_millis(100),
                centered: false,
            },
        );
        let command = *controller.begin(center(&t, 0, 0)).unwrap().command().unwrap();
        assert_eq!(command.target, t.cell_to_world(GridPoint::new(1, 0), false));
        assert_eq!(command.duration, Duration::from_millis(100));
    }

    #[test]
    fn test_agents_share_grid_across_threads() {
        let (grid, t) = world(&[".......", ".#####.", ".......", ".#####.", "......."]);
        let planner = PathPlanner::new(PlannerOptions {
            diagonal_movement: Some(DiagonalMovement::OnlyWhenNoObstacles),
            ..PlannerOptions::default()
        });
        let goal = center(&t, 6, 4);

        let handles: Vec<_> = [(0, 0), (6, 0), (0, 4), (3, 2)]
            .into_iter()
            .map(|(x, y)| {
                let grid = Arc::clone(&grid);
                let planner = planner.clone();
                std::thread::spawn(move || {
                    let mut controller = MovementController::new(
                        grid,
                        t,
                        planner,
                        goal,
                        NoAnimation,
                        MovementSettings::default(),
                    );
                    let mut outcome = controller.begin(center(&t, x, y)).unwrap();
                    while let StepOutcome::Move(command) = outcome {
                        outcome = controller.step(command.ticket);
                    }
                    t.world_to_cell(&controller.position())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), GridPoint::new(6, 4));
        }
    }
}
