//! Ammo and cooldown gating for bullets and bombs.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::constants::combat as combat_consts;
use super::physics::{CollisionCategory, RayFilter, RayHit, WorldQuery};

/// When a loaded, cooled-down weapon actually fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Fire as soon as the cooldown expires, regardless of requests
    #[default]
    Autofire,
    /// Fire only while the matching request flag is set
    OnRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weapon {
    Bullet,
    Bomb,
}

impl std::fmt::Display for Weapon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Weapon::Bullet => write!(f, "bullet"),
            Weapon::Bomb => write!(f, "bomb"),
        }
    }
}

/// Ammo count and cooldown timer for one weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponSlot {
    count: u32,
    max: u32,
    cooldown_remaining: f32,
    cooldown_duration: f32,
}

impl WeaponSlot {
    /// A fully loaded slot with no pending cooldown.
    pub fn full(max: u32, cooldown_duration: f32) -> Self {
        Self {
            count: max,
            max,
            cooldown_remaining: 0.0,
            cooldown_duration,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    pub fn cooldown_duration(&self) -> f32 {
        self.cooldown_duration
    }

    /// Counts down the cooldown (never below zero), then fires if loaded and ready.
    /// Decrementing the count and restarting the cooldown happen together.
    fn advance(&mut self, dt: f32, requested: bool, mode: TriggerMode) -> bool {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);

        let triggered = match mode {
            TriggerMode::Autofire => true,
            TriggerMode::OnRequest => requested,
        };
        if triggered && self.count > 0 && self.cooldown_remaining <= 0.0 {
            self.count -= 1;
            self.cooldown_remaining = self.cooldown_duration;
            true
        } else {
            false
        }
    }
}

/// Which weapons fired this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FireDecision {
    pub bullet: bool,
    pub bomb: bool,
}

impl FireDecision {
    pub fn any(&self) -> bool {
        self.bullet || self.bomb
    }
}

/// Per-character ammunition and cooldowns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmoPool {
    pub bullets: WeaponSlot,
    pub bombs: WeaponSlot,
    trigger_mode: TriggerMode,
}

impl AmmoPool {
    pub fn new(
        max_bullets: u32,
        bullet_cooldown: f32,
        max_bombs: u32,
        bomb_cooldown: f32,
        trigger_mode: TriggerMode,
    ) -> Self {
        Self {
            bullets: WeaponSlot::full(max_bullets, bullet_cooldown),
            bombs: WeaponSlot::full(max_bombs, bomb_cooldown),
            trigger_mode,
        }
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    /// Advances both weapons by `dt`, independently.
    pub fn advance(&mut self, shoot_requested: bool, throw_requested: bool, dt: f32) -> FireDecision {
        FireDecision {
            bullet: self.bullets.advance(dt, shoot_requested, self.trigger_mode),
            bomb: self.bombs.advance(dt, throw_requested, self.trigger_mode),
        }
    }

    /// What `advance` would decide, without touching the pool.
    pub fn preview(&self, shoot_requested: bool, throw_requested: bool, dt: f32) -> FireDecision {
        let mut scratch = *self;
        scratch.advance(shoot_requested, throw_requested, dt)
    }

    /// Restores both weapons to full with no pending cooldown.
    pub fn refill(&mut self) {
        self.bullets = WeaponSlot::full(self.bullets.max, self.bullets.cooldown_duration);
        self.bombs = WeaponSlot::full(self.bombs.max, self.bombs.cooldown_duration);
    }
}

/// A weapon discharge, reported for external damage and effect handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FireEvent {
    BulletFired {
        origin: [f32; 3],
        direction: [f32; 3],
        /// First target along the shot, if any, within hit-scan range
        hit: Option<RayHit>,
    },
    BombThrown {
        origin: [f32; 3],
        direction: [f32; 3],
    },
}

/// Instant ray along the shot direction against the target category.
pub fn hit_scan<W: WorldQuery + ?Sized>(
    world: &W,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    exclude: Option<u64>,
) -> Option<RayHit> {
    let filter = RayFilter {
        exclude,
        category: Some(CollisionCategory::Target),
    };
    world.cast_ray(origin, direction, combat_consts::HIT_SCAN_RANGE, filter)
}
