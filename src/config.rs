//! Arena configuration parsing from arena.toml files

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::game::combat::TriggerMode;
use crate::game::constants::{character as defaults, ground as ground_consts, physics as physics_consts};
use crate::game::instance::ControllerParams;
use crate::game::locomotion::LocomotionParams;
use crate::game::physics::{CollisionCategory, PartShape};

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("slope_limit_degrees must be within [5, 60], got {0}")]
    SlopeLimitOutOfRange(f32),
    #[error("{field} must be a finite, non-negative number, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be a finite, positive number, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("Duplicate entity id {0}")]
    DuplicateId(u64),
}

/// Per-character controller tuning. Set once; validated before any tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Maximum slope the character can stand and jump on
    pub slope_limit_degrees: f32,
    /// Move speed in meters/second
    pub move_speed: f32,
    /// Turn speed in degrees/second, left (+) or right (-)
    pub turn_speed: f32,
    pub allow_jump: bool,
    /// Upward speed to apply when jumping in meters/second
    pub jump_speed: f32,
    /// Whether the character can shoot or throw
    pub allow_battle: bool,
    pub max_bullets: u32,
    pub bullet_cooldown_seconds: f32,
    pub max_bombs: u32,
    pub bomb_cooldown_seconds: f32,
    pub projectile_speed: f32,
    pub trigger_mode: TriggerMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            slope_limit_degrees: defaults::DEFAULT_SLOPE_LIMIT_DEGREES,
            move_speed: defaults::DEFAULT_MOVE_SPEED,
            turn_speed: defaults::DEFAULT_TURN_SPEED,
            allow_jump: true,
            jump_speed: defaults::DEFAULT_JUMP_SPEED,
            allow_battle: true,
            max_bullets: defaults::DEFAULT_MAX_BULLETS,
            bullet_cooldown_seconds: defaults::DEFAULT_BULLET_COOLDOWN,
            max_bombs: defaults::DEFAULT_MAX_BOMBS,
            bomb_cooldown_seconds: defaults::DEFAULT_BOMB_COOLDOWN,
            projectile_speed: defaults::DEFAULT_PROJECTILE_SPEED,
            trigger_mode: TriggerMode::default(),
        }
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl ControllerConfig {
    /// Checks every field and produces the runtime parameters.
    pub fn validate(&self) -> Result<ControllerParams, ConfigError> {
        if !(ground_consts::MIN_SLOPE_LIMIT_DEGREES..=ground_consts::MAX_SLOPE_LIMIT_DEGREES)
            .contains(&self.slope_limit_degrees)
        {
            return Err(ConfigError::SlopeLimitOutOfRange(self.slope_limit_degrees));
        }

        Ok(ControllerParams {
            locomotion: LocomotionParams {
                move_speed: non_negative("move_speed", self.move_speed)?,
                turn_speed: non_negative("turn_speed", self.turn_speed)?,
                allow_jump: self.allow_jump,
                jump_speed: non_negative("jump_speed", self.jump_speed)?,
            },
            allow_battle: self.allow_battle,
            max_bullets: self.max_bullets,
            bullet_cooldown: non_negative("bullet_cooldown_seconds", self.bullet_cooldown_seconds)?,
            max_bombs: self.max_bombs,
            bomb_cooldown: non_negative("bomb_cooldown_seconds", self.bomb_cooldown_seconds)?,
            projectile_speed: non_negative("projectile_speed", self.projectile_speed)?,
            trigger_mode: self.trigger_mode,
        })
    }
}

/// Capsule collider dimensions shared by characters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub radius: f32,
    /// Total capsule height, including both hemispheres
    pub height: f32,
    /// Uniform transform scale
    pub scale: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            radius: defaults::DEFAULT_RADIUS,
            height: defaults::DEFAULT_HEIGHT,
            scale: 1.0,
        }
    }
}

/// A fixed piece of world geometry
#[derive(Debug, Clone, Deserialize)]
pub struct PartConfig {
    pub id: u64,
    pub position: [f32; 3],
    /// Full extents (blocks) or diameter in x (balls)
    pub size: [f32; 3],
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_part_shape")]
    pub shape: PartShape,
    #[serde(default = "default_part_category")]
    pub category: CollisionCategory,
}

fn default_part_shape() -> PartShape {
    PartShape::Block
}

fn default_part_category() -> CollisionCategory {
    CollisionCategory::Static
}

/// A controlled character placed in the arena
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    pub id: u64,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
    /// Bullet/bomb spawn point relative to the character origin, unrotated
    #[serde(default)]
    pub muzzle: Option<[f32; 3]>,
    /// Fields set here replace the arena-wide `[controller]` values
    #[serde(default)]
    pub controller: Option<ControllerOverride>,
    /// `target` makes this character visible to other characters' hit-scan
    #[serde(default = "default_character_category")]
    pub category: CollisionCategory,
}

fn default_character_category() -> CollisionCategory {
    CollisionCategory::Character
}

impl CharacterConfig {
    /// The arena controller settings with this character's overrides applied
    pub fn controller_config(&self, arena: &ControllerConfig) -> ControllerConfig {
        match &self.controller {
            Some(overrides) => overrides.apply(arena),
            None => arena.clone(),
        }
    }
}

/// Partial `[characters.controller]` table. Unset fields inherit from the arena.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerOverride {
    pub slope_limit_degrees: Option<f32>,
    pub move_speed: Option<f32>,
    pub turn_speed: Option<f32>,
    pub allow_jump: Option<bool>,
    pub jump_speed: Option<f32>,
    pub allow_battle: Option<bool>,
    pub max_bullets: Option<u32>,
    pub bullet_cooldown_seconds: Option<f32>,
    pub max_bombs: Option<u32>,
    pub bomb_cooldown_seconds: Option<f32>,
    pub projectile_speed: Option<f32>,
    pub trigger_mode: Option<TriggerMode>,
}

impl ControllerOverride {
    pub fn apply(&self, base: &ControllerConfig) -> ControllerConfig {
        ControllerConfig {
            slope_limit_degrees: self.slope_limit_degrees.unwrap_or(base.slope_limit_degrees),
            move_speed: self.move_speed.unwrap_or(base.move_speed),
            turn_speed: self.turn_speed.unwrap_or(base.turn_speed),
            allow_jump: self.allow_jump.unwrap_or(base.allow_jump),
            jump_speed: self.jump_speed.unwrap_or(base.jump_speed),
            allow_battle: self.allow_battle.unwrap_or(base.allow_battle),
            max_bullets: self.max_bullets.unwrap_or(base.max_bullets),
            bullet_cooldown_seconds: self
                .bullet_cooldown_seconds
                .unwrap_or(base.bullet_cooldown_seconds),
            max_bombs: self.max_bombs.unwrap_or(base.max_bombs),
            bomb_cooldown_seconds: self.bomb_cooldown_seconds.unwrap_or(base.bomb_cooldown_seconds),
            projectile_speed: self.projectile_speed.unwrap_or(base.projectile_speed),
            trigger_mode: self.trigger_mode.unwrap_or(base.trigger_mode),
        }
    }
}

/// Arena configuration from arena.toml
#[derive(Debug, Clone, Deserialize)]
pub struct ArenaConfig {
    /// Display name of the arena
    pub name: String,
    /// Fixed ticks per second
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Downward gravity magnitude in m/s²
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub parts: Vec<PartConfig>,
    #[serde(default)]
    pub characters: Vec<CharacterConfig>,
}

fn default_tick_rate() -> u32 {
    physics_consts::DEFAULT_TICK_RATE
}

fn default_gravity() -> f32 {
    physics_consts::DEFAULT_GRAVITY
}

impl ArenaConfig {
    /// Load arena configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Load arena configuration from a directory containing arena.toml
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_file(&dir.join("arena.toml"))
    }

    /// Seconds per tick
    pub fn timestep(&self) -> Result<f32, ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::NonPositive {
                field: "tick_rate",
                value: 0.0,
            });
        }
        Ok(1.0 / self.tick_rate as f32)
    }

    /// Checks values that span sections: ids are unique, numbers are sane
    /// and every controller override validates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timestep()?;
        non_negative("gravity", self.gravity)?;
        self.controller.validate()?;

        let mut seen = HashSet::new();
        let ids = self
            .parts
            .iter()
            .map(|p| p.id)
            .chain(self.characters.iter().map(|c| c.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateId(id));
            }
        }

        for character in self.characters.iter().filter(|c| c.controller.is_some()) {
            character.controller_config(&self.controller).validate()?;
        }
        Ok(())
    }
}
