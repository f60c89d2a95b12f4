use std::time::Duration;

use anyhow::Context;
use tilechase_navigation::{
    AnimationSink, GoalProvider, MovementController, MovementPhase, StepCommand, StepOutcome,
    WorldPoint,
};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::blackboard::{self, Blackboard};

/// Requests sent to a running pursuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseControl {
    Run,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ChaseReport {
    pub name: String,
    pub steps: usize,
    pub position: WorldPoint,
    pub phase: MovementPhase,
}

/// Drives one enemy's controller, interpolating each step on a frame tick.
pub struct Chase<G, A> {
    pub name: String,
    pub controller: MovementController<G, A>,
    pub frame: Duration,
    /// Delay before an idle enemy plans again.
    pub repath: Duration,
    pub blackboard: Blackboard,
}

impl<G: GoalProvider, A: AnimationSink> Chase<G, A> {
    pub async fn run(
        mut self,
        start: WorldPoint,
        mut control: watch::Receiver<ChaseControl>,
    ) -> anyhow::Result<ChaseReport> {
        info!(enemy = %self.name, %start, "Pursuit started");
        let mut position = start;
        let mut steps = 0usize;
        let mut outcome = self
            .controller
            .begin(start)
            .with_context(|| format!("{} cannot start at {}", self.name, start))?;
        blackboard::set_enemy_position(&self.blackboard, &self.name, position);

        loop {
            let halt = match outcome {
                StepOutcome::Move(command) => {
                    tokio::select! {
                        () = interpolate(&mut position, command, self.frame, &self.blackboard, &self.name) => {
                            steps += 1;
                            outcome = self.controller.step(command.ticket);
                            continue;
                        }
                        halt = halted(&mut control) => halt,
                    }
                }
                StepOutcome::Idle | StepOutcome::Ignored => {
                    tokio::select! {
                        () = time::sleep(self.repath) => {
                            debug!(enemy = %self.name, "Replanning from idle");
                            outcome = self.controller.begin(position)?;
                            continue;
                        }
                        halt = halted(&mut control) => halt,
                    }
                }
            };

            if halt == ChaseControl::Shutdown {
                break;
            }

            self.controller.stop();
            info!(enemy = %self.name, %position, "Pursuit stopped");
            if released(&mut control).await == ChaseControl::Shutdown {
                break;
            }
            outcome = match self.controller.resume() {
                Some(command) => StepOutcome::Move(command),
                None => self.controller.begin(position)?,
            };
            info!(enemy = %self.name, "Pursuit resumed");
        }

        info!(enemy = %self.name, steps, %position, "Pursuit finished");
        Ok(ChaseReport {
            name: self.name,
            steps,
            position,
            phase: self.controller.phase(),
        })
    }
}

/// Moves `position` towards the command's target, finishing exactly on it.
async fn interpolate(
    position: &mut WorldPoint,
    command: StepCommand,
    frame: Duration,
    bb: &Blackboard,
    name: &str,
) {
    let from = *position;
    let started = Instant::now();
    let mut ticker = time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();
        if elapsed >= command.duration {
            *position = command.target;
            blackboard::set_enemy_position(bb, name, *position);
            return;
        }
        let t = elapsed.as_secs_f32() / command.duration.as_secs_f32();
        *position = from.lerp(command.target, t);
        blackboard::set_enemy_position(bb, name, *position);
    }
}

/// Waits until the pursuit is asked to stop or shut down.
async fn halted(control: &mut watch::Receiver<ChaseControl>) -> ChaseControl {
    match control.wait_for(|c| *c != ChaseControl::Run).await {
        Ok(c) => *c,
        Err(_) => ChaseControl::Shutdown,
    }
}

/// Waits until a stopped pursuit may continue or must shut down.
async fn released(control: &mut watch::Receiver<ChaseControl>) -> ChaseControl {
    match control.wait_for(|c| *c != ChaseControl::Stop).await {
        Ok(c) => *c,
        Err(_) => ChaseControl::Shutdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tilechase_navigation::{
        GridBuilder, MovementSettings, MovementState, PathPlanner, PlannerOptions, TileLayerData,
    };

    const STEP: Duration = Duration::from_millis(100);

    fn chase(goal: WorldPoint, bb: &Blackboard) -> Chase<WorldPoint, impl AnimationSink + Send + 'static> {
        let layer = TileLayerData::from_text_rows(&["....."], ".", 10.0, 10.0, WorldPoint::new(0.0, 0.0));
        let (grid, transformer) = GridBuilder::from_layer(&layer).unwrap();
        let sink = {
            let bb = bb.clone();
            move |state: MovementState| blackboard::set_enemy_facing(&bb, "grunt", state)
        };
        let controller = MovementController::new(
            Arc::new(grid),
            transformer,
            PathPlanner::new(PlannerOptions::default()),
            goal,
            sink,
            MovementSettings {
                step_duration: STEP,
                centered: true,
            },
        );
        Chase {
            name: "grunt".into(),
            controller,
            frame: Duration::from_millis(10),
            repath: Duration::from_millis(200),
            blackboard: bb.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_static_goal() {
        let bb: Blackboard = Arc::default();
        let (tx, rx) = watch::channel(ChaseControl::Run);
        let task = tokio::spawn(chase(WorldPoint::new(45.0, 5.0), &bb).run(WorldPoint::new(5.0, 5.0), rx));

        time::sleep(Duration::from_secs(1)).await;
        tx.send(ChaseControl::Shutdown).unwrap();
        let report = task.await.unwrap().unwrap();

        assert_eq!(report.steps, 4);
        assert_eq!(report.position, WorldPoint::new(45.0, 5.0));
        assert_eq!(report.phase, MovementPhase::Idle);

        let enemy = blackboard::snapshot(&bb).enemies["grunt"];
        assert_eq!(enemy.position, WorldPoint::new(45.0, 5.0));
        assert_eq!(enemy.facing, MovementState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_until_resumed() {
        let bb: Blackboard = Arc::default();
        let (tx, rx) = watch::channel(ChaseControl::Run);
        let task = tokio::spawn(chase(WorldPoint::new(45.0, 5.0), &bb).run(WorldPoint::new(5.0, 5.0), rx));

        time::sleep(Duration::from_millis(150)).await;
        tx.send(ChaseControl::Stop).unwrap();
        time::sleep(Duration::from_millis(20)).await;
        let frozen = blackboard::snapshot(&bb).enemies["grunt"];
        assert!(frozen.position.x > 15.0 && frozen.position.x < 25.0);
        assert_eq!(frozen.facing, MovementState::Idle);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(blackboard::snapshot(&bb).enemies["grunt"].position, frozen.position);

        tx.send(ChaseControl::Run).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        tx.send(ChaseControl::Shutdown).unwrap();
        let report = task.await.unwrap().unwrap();

        assert_eq!(report.steps, 4);
        assert_eq!(report.position, WorldPoint::new(45.0, 5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_stopped() {
        let bb: Blackboard = Arc::default();
        let (tx, rx) = watch::channel(ChaseControl::Run);
        let task = tokio::spawn(chase(WorldPoint::new(45.0, 5.0), &bb).run(WorldPoint::new(5.0, 5.0), rx));

        time::sleep(Duration::from_millis(50)).await;
        tx.send(ChaseControl::Stop).unwrap();
        time::sleep(Duration::from_millis(50)).await;
        tx.send(ChaseControl::Shutdown).unwrap();
        let report = task.await.unwrap().unwrap();

        assert_eq!(report.steps, 0);
        assert_eq!(report.phase, MovementPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_control_ends_pursuit() {
        let bb: Blackboard = Arc::default();
        let (tx, rx) = watch::channel(ChaseControl::Run);
        let task = tokio::spawn(chase(WorldPoint::new(5.0, 5.0), &bb).run(WorldPoint::new(5.0, 5.0), rx));

        drop(tx);
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.phase, MovementPhase::Idle);
    }

    #[tokio::test]
    async fn test_invalid_start_is_an_error() {
        let bb: Blackboard = Arc::default();
        let (_tx, rx) = watch::channel(ChaseControl::Run);
        let result = chase(WorldPoint::new(45.0, 5.0), &bb)
            .run(WorldPoint::new(f32::NAN, 5.0), rx)
            .await;
        assert!(result.is_err());
    }
}
