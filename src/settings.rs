use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tilechase_navigation::{MovementSettings, PlannerOptions, TileLayerData, WorldPoint};
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for environment overrides, e.g. `TILECHASE_MOVEMENT__STEP_SECONDS=0.25`.
const ENV_PREFIX: &str = "TILECHASE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub map: MapSettings,
    #[serde(default)]
    pub planner: PlannerOptions,
    pub movement: MovementConfig,
    pub player: PlayerSettings,
    #[serde(default)]
    pub enemies: Vec<EnemySettings>,
    /// How long the demo runs before every pursuit is shut down.
    pub run_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    pub tile_width: f32,
    pub tile_height: f32,
    /// Lowest corner of the layer's bounding box.
    pub origin: WorldPoint,
    /// Characters that mark a walkable tile in `rows`.
    #[serde(default = "default_walkable")]
    pub walkable: String,
    /// Layer rows, row 0 first.
    pub rows: Vec<String>,
}

fn default_walkable() -> String {
    ".".to_string()
}

impl MapSettings {
    pub fn to_layer(&self) -> TileLayerData {
        TileLayerData::from_text_rows(
            &self.rows,
            &self.walkable,
            self.tile_width,
            self.tile_height,
            self.origin,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementConfig {
    pub step_seconds: f64,
    pub frame_rate: u32,
    #[serde(default = "default_centered")]
    pub centered: bool,
    /// Delay before an idle pursuer replans.
    pub repath_seconds: f64,
}

fn default_centered() -> bool {
    true
}

impl MovementConfig {
    pub fn settings(&self) -> MovementSettings {
        MovementSettings {
            step_duration: Duration::from_secs_f64(self.step_seconds),
            centered: self.centered,
        }
    }

    pub fn frame(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate))
    }

    pub fn repath(&self) -> Duration {
        Duration::from_secs_f64(self.repath_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSettings {
    /// World units per second.
    pub speed: f32,
    pub waypoints: Vec<WorldPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnemySettings {
    pub name: String,
    pub start: WorldPoint,
    /// Stop the pursuit after this long. Runs until shutdown when absent.
    pub lifetime_seconds: Option<f64>,
    /// Resume this long after the lifetime stop. Stays stopped when absent.
    pub pause_seconds: Option<f64>,
}

impl Settings {
    /// Checks values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(self.movement.step_seconds.is_finite() && self.movement.step_seconds >= 0.0) {
            return Err(ConfigError::Message("movement.step_seconds must be non-negative".into()));
        }
        if self.movement.frame_rate == 0 {
            return Err(ConfigError::Message("movement.frame_rate must be positive".into()));
        }
        if !positive(self.movement.repath_seconds) {
            return Err(ConfigError::Message("movement.repath_seconds must be positive".into()));
        }
        if !positive(self.run_seconds) {
            return Err(ConfigError::Message("run_seconds must be positive".into()));
        }
        if self.player.waypoints.is_empty() {
            return Err(ConfigError::Message("player.waypoints must not be empty".into()));
        }
        if let Some(enemy) = self
            .enemies
            .iter()
            .find(|e| {
                e.lifetime_seconds.is_some_and(|s| !positive(s))
                    || e.pause_seconds.is_some_and(|s| !positive(s))
            })
        {
            return Err(ConfigError::Message(format!(
                "enemy {} has a non-positive lifetime or pause",
                enemy.name
            )));
        }
        Ok(())
    }
}

fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Settings, ConfigError> {
    let settings: Settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let settings = build(Config::builder().add_source(File::new(path, FileFormat::Toml).required(true)));

    match settings {
        Ok(settings) => {
            info!(
                enemies = settings.enemies.len(),
                rows = settings.map.rows.len(),
                "Successfully loaded configuration"
            );
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
pub fn settings_from_str(toml: &str) -> Result<Settings, ConfigError> {
    build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}
