use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use spin_sleep::SpinSleeper;
use tilechase_navigation::WorldPoint;
use tracing::info;

use crate::blackboard::{self, Blackboard};

const TICK: Duration = Duration::from_millis(10);

/// Walks the player around a closed loop of waypoints at constant speed.
#[derive(Debug, Clone)]
pub struct PlayerRoute {
    waypoints: Vec<WorldPoint>,
    speed: f32,
    next: usize,
    position: WorldPoint,
}

impl PlayerRoute {
    /// Starts at the first waypoint. Returns `None` when there are none.
    pub fn new(waypoints: Vec<WorldPoint>, speed: f32) -> Option<Self> {
        let position = *waypoints.first()?;
        Some(Self {
            next: 1 % waypoints.len(),
            waypoints,
            speed: speed.max(0.0),
            position,
        })
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    /// Moves `speed * dt` along the route, turning at waypoints.
    pub fn advance(&mut self, dt: Duration) -> WorldPoint {
        let mut budget = self.speed * dt.as_secs_f32();
        // A full lap without progress means every waypoint is the same point.
        let mut idle_turns = 0;
        while budget > 0.0 && idle_turns < self.waypoints.len() {
            let target = self.waypoints[self.next];
            let (dx, dy) = (target.x - self.position.x, target.y - self.position.y);
            let remaining = dx.hypot(dy);
            if remaining > budget {
                self.position = self.position.lerp(target, budget / remaining);
                break;
            }
            budget -= remaining;
            idle_turns = if remaining == 0.0 { idle_turns + 1 } else { 0 };
            self.position = target;
            self.next = (self.next + 1) % self.waypoints.len();
        }
        self.position
    }
}

/// Spawns the player motion thread. It publishes to the blackboard until
/// `running` is cleared.
pub fn spawn(
    bb: Blackboard,
    mut route: PlayerRoute,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    blackboard::set_player(&bb, route.position());
    std::thread::Builder::new().name("player".into()).spawn(move || {
        info!("Player thread started.");
        let sleeper = SpinSleeper::new(10_000);
        while running.load(Ordering::Relaxed) {
            let position = route.advance(TICK);
            blackboard::set_player(&bb, position);
            sleeper.sleep(TICK);
        }
        info!(position = %route.position(), "Player thread stopped.");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<WorldPoint> {
        vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(10.0, 0.0),
            WorldPoint::new(10.0, 10.0),
            WorldPoint::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_empty_route() {
        assert!(PlayerRoute::new(Vec::new(), 1.0).is_none());
    }

    #[test]
    fn test_advance_turns_corners() {
        let mut route = PlayerRoute::new(square(), 10.0).unwrap();
        assert_eq!(route.advance(Duration::from_millis(500)), WorldPoint::new(5.0, 0.0));
        assert_eq!(route.advance(Duration::from_secs(1)), WorldPoint::new(10.0, 5.0));
    }

    #[test]
    fn test_route_loops_back_to_start() {
        let mut route = PlayerRoute::new(square(), 10.0).unwrap();
        assert_eq!(route.advance(Duration::from_secs(4)), WorldPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_single_waypoint_stays_put() {
        let mut route = PlayerRoute::new(vec![WorldPoint::new(3.0, 4.0)], 10.0).unwrap();
        assert_eq!(route.advance(Duration::from_secs(1)), WorldPoint::new(3.0, 4.0));
    }

    #[test]
    fn test_thread_publishes_and_stops() {
        let bb: Blackboard = Arc::default();
        let running = Arc::new(AtomicBool::new(true));
        let route = PlayerRoute::new(square(), 10.0).unwrap();
        let handle = spawn(bb.clone(), route, running.clone()).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        let player = blackboard::player_position(&bb);
        assert!(player.x > 0.0 && player.y == 0.0);
    }
}
