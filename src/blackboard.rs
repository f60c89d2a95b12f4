use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

use tilechase_navigation::{MovementState, WorldPoint};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnemySnapshot {
    pub position: WorldPoint,
    pub facing: MovementState,
}

#[derive(Debug, Clone, Default)]
pub struct State {
    pub player: WorldPoint,
    pub enemies: BTreeMap<String, EnemySnapshot>,
    pub faults: Vec<String>,
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn player_position(bb: &Blackboard) -> WorldPoint {
    bb.read().player
}

pub fn set_player(bb: &Blackboard, position: WorldPoint) {
    bb.write().player = position;
}

pub fn set_enemy_position(bb: &Blackboard, name: &str, position: WorldPoint) {
    let mut g = bb.write();
    g.enemies.entry(name.to_string()).or_default().position = position;
}

pub fn set_enemy_facing(bb: &Blackboard, name: &str, facing: MovementState) {
    let mut g = bb.write();
    g.enemies.entry(name.to_string()).or_default().facing = facing;
}

/// Records a fault once. Returns false if it was already recorded.
pub fn raise_fault(bb: &Blackboard, msg: &str) -> bool {
    let mut g = bb.write();
    if g.faults.iter().any(|s| s == msg) {
        return false;
    }
    warn!(fault = msg, total = g.faults.len() + 1, "Fault raised");
    g.faults.push(msg.to_string());
    true
}
