use nalgebra::Vector3;
use serde::Serialize;

use super::constants::combat as combat_consts;

/// A fired bullet travelling in a straight line until its lifetime runs out.
///
/// Velocity is fixed at spawn; there is no drag, gravity or collision response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub id: u64,
    /// Character that fired it
    pub owner: u64,
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub speed: f32,
    pub remaining_lifetime: f32,
}

impl Projectile {
    /// Spawns a projectile; `direction` is normalized here.
    pub fn spawn(id: u64, owner: u64, position: Vector3<f32>, direction: Vector3<f32>, speed: f32) -> Self {
        Self {
            id,
            owner,
            position,
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros),
            speed,
            remaining_lifetime: combat_consts::PROJECTILE_LIFETIME,
        }
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.direction * self.speed
    }

    pub fn is_alive(&self) -> bool {
        self.remaining_lifetime > 0.0
    }

    /// Moves the projectile and counts down its lifetime. Returns whether it survives.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.position += self.velocity() * dt;
        self.remaining_lifetime -= dt;
        self.is_alive()
    }

    pub fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            owner: self.owner,
            position: [self.position.x, self.position.y, self.position.z],
            velocity: {
                let v = self.velocity();
                [v.x, v.y, v.z]
            },
            remaining_lifetime: self.remaining_lifetime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub owner: u64,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub remaining_lifetime: f32,
}
