mod blackboard; // shared player/enemy state
mod bus; // facing event topic
mod chase; // per-enemy pursuit task
mod settings; // TOML + environment configuration
mod player; // player motion thread

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use blackboard::{Blackboard, raise_fault, snapshot};
use bus::{FacingEvent, Topic};
use chase::{Chase, ChaseControl};
use settings::{EnemySettings, Settings};
use tilechase_navigation::{
    CoordinateTransformer, Grid, GridBuilder, MovementController, MovementState, PathPlanner,
    WorldPoint,
};
use tokio::sync::{broadcast, watch};
use tracing::{error, info, trace, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings::DEFAULT_CONFIG_PATH.to_string());
    let settings = settings::load_settings(&path)?;

    info!("Tilechase started.");
    match run(settings).await {
        Ok(()) => info!("Tilechase finished successfully."),
        Err(e) => {
            error!("Tilechase failed: {:?}", e);
            return Err(e);
        }
    }
    Ok(())
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let layer = settings.map.to_layer();
    let (grid, transformer) =
        GridBuilder::from_layer(&layer).context("building the walkability grid")?;
    info!(
        width = grid.width(),
        height = grid.height(),
        walkable = grid.walkable_count(),
        "Map loaded\n{}",
        grid
    );
    let grid = Arc::new(grid);
    let planner = PathPlanner::new(settings.planner);

    let player_start = settings.player.waypoints.first().copied().unwrap_or_default();
    for name in cut_off_enemies(&grid, &transformer, &planner, &settings.enemies, player_start) {
        warn!(enemy = %name, %player_start, "Enemy has no path to the player's starting point");
    }

    let bb: Blackboard = Arc::default();
    let facing_topic: Topic<FacingEvent> = Topic::new(64);
    let animation = tokio::spawn(animation_log(facing_topic.subscribe()));

    let running = Arc::new(AtomicBool::new(true));
    let route = player::PlayerRoute::new(settings.player.waypoints.clone(), settings.player.speed)
        .context("player route has no waypoints")?;
    info!("Spawning player thread...");
    let player = player::spawn(Arc::clone(&bb), route, Arc::clone(&running))?;

    let mut controls = Vec::with_capacity(settings.enemies.len());
    let mut pursuits = Vec::with_capacity(settings.enemies.len());
    for enemy in &settings.enemies {
        let (tx, rx) = watch::channel(ChaseControl::Run);
        let tx = Arc::new(tx);
        let chase = enemy_chase(
            enemy,
            &settings,
            Arc::clone(&grid),
            transformer,
            planner.clone(),
            &bb,
            &facing_topic,
        );
        pursuits.push((enemy.name.clone(), tokio::spawn(chase.run(enemy.start, rx))));
        if let Some(lifetime) = enemy.lifetime_seconds {
            tokio::spawn(schedule_stop(
                Arc::clone(&tx),
                Duration::from_secs_f64(lifetime),
                enemy.pause_seconds.map(Duration::from_secs_f64),
            ));
        }
        controls.push(tx);
    }

    tokio::time::sleep(Duration::from_secs_f64(settings.run_seconds)).await;
    info!("Run time elapsed, shutting down pursuits.");
    for tx in &controls {
        let _ = tx.send(ChaseControl::Shutdown);
    }

    for (name, handle) in pursuits {
        match handle.await {
            Ok(Ok(report)) => info!(
                enemy = %report.name,
                steps = report.steps,
                position = %report.position,
                phase = ?report.phase,
                "Pursuit report"
            ),
            Ok(Err(e)) => {
                warn!(enemy = %name, "Pursuit failed: {:?}", e);
                raise_fault(&bb, &format!("{name}: pursuit failed"));
            }
            Err(e) => {
                warn!(enemy = %name, "Pursuit task panicked: {}", e);
                raise_fault(&bb, &format!("{name}: pursuit panicked"));
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    if player.join().is_err() {
        raise_fault(&bb, "player thread panicked");
    }
    drop(facing_topic);
    let tally = animation.await?;
    info!(walks = tally.walks, rests = tally.rests, "Animation summary");

    let state = snapshot(&bb);
    info!(player = %state.player, "Final player position");
    if !state.faults.is_empty() {
        anyhow::bail!("run ended with faults: {}", state.faults.join(", "));
    }
    Ok(())
}

fn enemy_chase(
    enemy: &EnemySettings,
    settings: &Settings,
    grid: Arc<Grid>,
    transformer: CoordinateTransformer,
    planner: PathPlanner,
    bb: &Blackboard,
    facing_topic: &Topic<FacingEvent>,
) -> Chase<impl Fn() -> WorldPoint + Send + 'static, impl FnMut(MovementState) + Send + 'static> {
    let goal = {
        let bb = Arc::clone(bb);
        move || blackboard::player_position(&bb)
    };
    let sink = {
        let bb = Arc::clone(bb);
        let topic = facing_topic.clone();
        let name = enemy.name.clone();
        move |state: MovementState| {
            blackboard::set_enemy_facing(&bb, &name, state);
            let reached = topic.publish(FacingEvent {
                enemy: name.clone(),
                state,
            });
            if reached == 0 {
                trace!(enemy = %name, clip = state.clip_name(), "No animation subscribers");
            }
        }
    };
    let controller = MovementController::new(
        grid,
        transformer,
        planner,
        goal,
        sink,
        settings.movement.settings(),
    );
    Chase {
        name: enemy.name.clone(),
        controller,
        frame: settings.movement.frame(),
        repath: settings.movement.repath(),
        blackboard: Arc::clone(bb),
    }
}

/// Stops a pursuit after `lifetime`, and resumes it after `pause` if given.
async fn schedule_stop(
    control: Arc<watch::Sender<ChaseControl>>,
    lifetime: Duration,
    pause: Option<Duration>,
) {
    tokio::time::sleep(lifetime).await;
    if *control.borrow() != ChaseControl::Run {
        return;
    }
    let _ = control.send(ChaseControl::Stop);

    let Some(pause) = pause else {
        return;
    };
    tokio::time::sleep(pause).await;
    if *control.borrow() == ChaseControl::Stop {
        let _ = control.send(ChaseControl::Run);
    }
}

/// Names of enemies whose start cell has no path to `target`.
fn cut_off_enemies(
    grid: &Grid,
    transformer: &CoordinateTransformer,
    planner: &PathPlanner,
    enemies: &[EnemySettings],
    target: WorldPoint,
) -> Vec<String> {
    let goal = transformer.world_to_cell(&target);
    enemies
        .iter()
        .filter(|enemy| {
            let start = transformer.world_to_cell(&enemy.start);
            !planner.find_path_detailed(grid, start, goal).is_success()
        })
        .map(|enemy| enemy.name.clone())
        .collect()
}

/// Clip switches seen by the animation log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct AnimationTally {
    walks: usize,
    rests: usize,
}

/// Logs the clip every enemy switches to until the topic closes.
async fn animation_log(mut rx: broadcast::Receiver<Arc<FacingEvent>>) -> AnimationTally {
    info!("Animation log started.");
    let mut tally = AnimationTally::default();
    loop {
        match rx.recv().await {
            Ok(event) => {
                if event.state.is_moving() {
                    tally.walks += 1;
                } else {
                    tally.rests += 1;
                }
                info!(enemy = %event.enemy, clip = event.state.clip_name(), "Play");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "Animation log lagged behind.");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    info!(?tally, "Animation log finished.");
    tally
}
