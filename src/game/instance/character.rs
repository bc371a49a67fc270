use nalgebra::Vector3;
use tracing::{debug, trace};

use super::character_controller::{sense, CapsuleGeometry, GroundSensorSample};
use crate::config::{ConfigError, ControllerConfig, GeometryConfig};
use crate::game::actions::{ActionVector, ControlInputs};
use crate::game::combat::{hit_scan, AmmoPool, FireDecision, FireEvent, TriggerMode, Weapon};
use crate::game::locomotion::{forward_from_yaw, integrate, LocomotionParams, Motion};
use crate::game::physics::{yaw_rotation, WorldQuery};

/// Errors raised while ticking a character or routing work to it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    #[error("character {character} would fire a {weapon} but has no muzzle")]
    MissingMuzzle { character: u64, weapon: Weapon },
    #[error("character {0} has no physics body")]
    MissingBody(u64),
    #[error("no character with id {0}")]
    UnknownCharacter(u64),
    #[error("entity id {0} is already in use")]
    DuplicateEntity(u64),
    #[error("tick duration must be finite and positive, got {0}")]
    InvalidTimestep(f32),
}

/// Validated controller tuning, produced by `ControllerConfig::validate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerParams {
    pub locomotion: LocomotionParams,
    pub allow_battle: bool,
    pub max_bullets: u32,
    pub bullet_cooldown: f32,
    pub max_bombs: u32,
    pub bomb_cooldown: f32,
    pub projectile_speed: f32,
    pub trigger_mode: TriggerMode,
}

/// Mutable per-character state. Updated once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    pub position: Vector3<f32>,
    /// Facing yaw in radians, wrapped to [-π, π)
    pub yaw: f32,
    pub velocity: Vector3<f32>,
    pub grounded: bool,
    pub inputs: ControlInputs,
}

/// Spawn point for bullets and bombs, relative to the character origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Muzzle {
    pub offset: Vector3<f32>,
}

impl Muzzle {
    pub fn new(offset: [f32; 3]) -> Self {
        Self {
            offset: Vector3::new(offset[0], offset[1], offset[2]),
        }
    }

    /// World-space muzzle point for a character at `position` facing `yaw`.
    pub fn world_point(&self, position: Vector3<f32>, yaw: f32) -> Vector3<f32> {
        position + yaw_rotation(yaw) * self.offset
    }
}

/// A bullet the owning instance should turn into a live projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub owner: u64,
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub speed: f32,
}

/// Everything one controller tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub ground: GroundSensorSample,
    /// Velocity to write to the physics body
    pub velocity: Vector3<f32>,
    pub yaw: f32,
    pub events: Vec<FireEvent>,
    pub projectiles: Vec<ProjectileSpawn>,
    /// Set when the combat stage could not run; the ammo pool was not advanced
    pub combat_failure: Option<ControllerError>,
}

/// One controlled character: state, geometry, tuning, ammunition and muzzle.
#[derive(Debug, Clone)]
pub struct Character {
    id: u64,
    state: ControllerState,
    geometry: CapsuleGeometry,
    params: ControllerParams,
    ammo: AmmoPool,
    muzzle: Option<Muzzle>,
}

fn to_array(v: Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

impl Character {
    /// Builds a character from raw configuration. Fails before any state exists
    /// if the configuration is invalid.
    pub fn new(
        id: u64,
        controller: &ControllerConfig,
        geometry: &GeometryConfig,
    ) -> Result<Self, ConfigError> {
        let params = controller.validate()?;
        let geometry = CapsuleGeometry::with_scale(
            geometry.radius,
            geometry.height,
            controller.slope_limit_degrees,
            geometry.scale,
        )?;
        Ok(Self::from_parts(id, params, geometry))
    }

    /// Builds a character from already validated parts.
    pub fn from_parts(id: u64, params: ControllerParams, geometry: CapsuleGeometry) -> Self {
        Self {
            id,
            state: ControllerState::default(),
            geometry,
            params,
            ammo: AmmoPool::new(
                params.max_bullets,
                params.bullet_cooldown,
                params.max_bombs,
                params.bomb_cooldown,
                params.trigger_mode,
            ),
            muzzle: None,
        }
    }

    pub fn with_muzzle(mut self, muzzle: Muzzle) -> Self {
        self.muzzle = Some(muzzle);
        self
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.state.position = position;
        self
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.state.yaw = yaw;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn geometry(&self) -> &CapsuleGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    pub fn ammo(&self) -> &AmmoPool {
        &self.ammo
    }

    pub fn muzzle(&self) -> Option<&Muzzle> {
        self.muzzle.as_ref()
    }

    /// Sets this tick's inputs from a discrete agent action.
    pub fn apply_action(&mut self, action: ActionVector) {
        self.state.inputs = action.decode();
    }

    /// Sets this tick's inputs from analog human controls, quantized through
    /// the same action vector an agent would send.
    pub fn apply_human_input(&mut self, inputs: &ControlInputs) {
        self.apply_action(ActionVector::encode(inputs));
    }

    /// Restores full ammunition with no pending cooldowns.
    pub fn refill_ammo(&mut self) {
        self.ammo.refill();
    }

    /// Pulls position and velocity back from the physics body after a step.
    pub fn sync_from_body(&mut self, position: Vector3<f32>, velocity: Vector3<f32>) {
        self.state.position = position;
        self.state.velocity = velocity;
    }

    /// Runs ground sensing, locomotion and combat for one tick, in that order.
    ///
    /// Only an invalid `dt` is an error, and then nothing is committed. A combat
    /// precondition failure is reported in `TickOutput::combat_failure`.
    pub fn tick<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        dt: f32,
    ) -> Result<TickOutput, ControllerError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ControllerError::InvalidTimestep(dt));
        }

        let ground = sense(
            world,
            self.state.position,
            self.state.yaw,
            &self.geometry,
            Some(self.id),
        );

        let motion = integrate(
            &self.state.inputs,
            Motion {
                velocity: self.state.velocity,
                yaw: self.state.yaw,
            },
            ground.grounded,
            &self.params.locomotion,
            dt,
        );

        // Combat fails alone: motion still applies and the pool stays untouched.
        let mut combat_failure = None;
        let fired = if self.params.allow_battle {
            let inputs = &self.state.inputs;
            let decision = self.ammo.preview(inputs.shoot, inputs.throw, dt);
            if decision.any() && self.muzzle.is_none() {
                let weapon = if decision.bullet { Weapon::Bullet } else { Weapon::Bomb };
                combat_failure = Some(ControllerError::MissingMuzzle {
                    character: self.id,
                    weapon,
                });
                FireDecision::default()
            } else {
                self.ammo.advance(inputs.shoot, inputs.throw, dt)
            }
        } else {
            FireDecision::default()
        };

        if ground.grounded != self.state.grounded {
            debug!(
                character = self.id,
                grounded = ground.grounded,
                distance = ?ground.hit_distance,
                angle = ?ground.normal_angle_degrees,
                "Ground state changed"
            );
        }
        self.state.grounded = ground.grounded;
        self.state.velocity = motion.velocity;
        self.state.yaw = motion.yaw;
        trace!(character = self.id, velocity = ?motion.velocity, yaw = motion.yaw, "Controller tick");

        let mut events = Vec::new();
        let mut projectiles = Vec::new();
        if let Some(muzzle) = self.muzzle.filter(|_| fired.any()) {
            let origin = muzzle.world_point(self.state.position, motion.yaw);
            let direction = forward_from_yaw(motion.yaw);

            if fired.bullet {
                let hit = hit_scan(world, origin, direction, Some(self.id));
                debug!(
                    character = self.id,
                    remaining = self.ammo.bullets.count(),
                    target = ?hit.and_then(|h| h.entity),
                    "Bullet fired"
                );
                events.push(FireEvent::BulletFired {
                    origin: to_array(origin),
                    direction: to_array(direction),
                    hit,
                });
                projectiles.push(ProjectileSpawn {
                    owner: self.id,
                    position: origin,
                    direction,
                    speed: self.params.projectile_speed,
                });
            }
            if fired.bomb {
                debug!(character = self.id, remaining = self.ammo.bombs.count(), "Bomb thrown");
                events.push(FireEvent::BombThrown {
                    origin: to_array(origin),
                    direction: to_array(direction),
                });
            }
        }

        Ok(TickOutput {
            ground,
            velocity: motion.velocity,
            yaw: motion.yaw,
            events,
            projectiles,
            combat_failure,
        })
    }
}
