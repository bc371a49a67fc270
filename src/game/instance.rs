use crossbeam_channel::{Receiver, Sender};
use nalgebra::Vector3;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::actions::{ActionVector, ControlInputs, QueuedAction};
use super::physics::{CollisionCategory, PartShape, PhysicsWorld};
use super::projectile::Projectile;
use crate::config::{ArenaConfig, ConfigError};

mod character;
pub mod character_controller;
mod observation;
mod tick_pipeline;

pub use character::{
    Character, ControllerError, ControllerParams, ControllerState, Muzzle, ProjectileSpawn,
    TickOutput,
};
pub use observation::{
    CharacterEvent, CharacterFailure, CharacterSnapshot, InstanceSnapshot, TickReport,
    WeaponSnapshot,
};

/// A fixed-timestep arena: characters driven by their controllers inside a
/// Rapier world, plus the projectiles they fire.
pub struct GameInstance {
    pub physics: PhysicsWorld,
    /// Characters keyed by id; iteration order is the tick order
    pub characters: BTreeMap<u64, Character>,
    pub projectiles: Vec<Projectile>,
    next_projectile_id: u64,
    pub tick: u64,
    dt: f32,
    action_receiver: Receiver<QueuedAction>,
    action_sender: Sender<QueuedAction>,
}

impl GameInstance {
    /// Creates an empty instance ticking `tick_rate` times per second
    pub fn new(tick_rate: u32) -> Result<Self, ConfigError> {
        if tick_rate == 0 {
            return Err(ConfigError::NonPositive {
                field: "tick_rate",
                value: 0.0,
            });
        }
        let (action_sender, action_receiver) = crossbeam_channel::unbounded();

        Ok(Self {
            physics: PhysicsWorld::new(),
            characters: BTreeMap::new(),
            projectiles: Vec::new(),
            next_projectile_id: 1,
            tick: 0,
            dt: 1.0 / tick_rate as f32,
            action_receiver,
            action_sender,
        })
    }

    /// Builds an instance with every part and character from an arena file
    pub fn from_config(config: &ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut instance = Self::new(config.tick_rate)?;
        instance.physics.set_gravity(config.gravity);

        for part in &config.parts {
            instance
                .add_part(part.id, part.position, part.rotation, part.size, part.shape, part.category)
                .map_err(|_| ConfigError::DuplicateId(part.id))?;
        }

        for spawn in &config.characters {
            let controller = spawn.controller_config(&config.controller);
            let [x, y, z] = spawn.position;
            let mut character = Character::new(spawn.id, &controller, &config.geometry)?
                .with_position(Vector3::new(x, y, z))
                .with_yaw(spawn.yaw_degrees.to_radians());
            if let Some(offset) = spawn.muzzle {
                character = character.with_muzzle(Muzzle::new(offset));
            }
            instance
                .add_character(character, spawn.category)
                .map_err(|_| ConfigError::DuplicateId(spawn.id))?;
        }

        info!(
            arena = %config.name,
            parts = config.parts.len(),
            characters = config.characters.len(),
            tick_rate = config.tick_rate,
            "Arena loaded"
        );
        Ok(instance)
    }

    /// Seconds simulated per tick
    pub fn timestep(&self) -> f32 {
        self.dt
    }

    /// Adds a fixed part (floor, ramp, wall, target dummy)
    pub fn add_part(
        &mut self,
        id: u64,
        position: [f32; 3],
        rotation_degrees: [f32; 3],
        size: [f32; 3],
        shape: PartShape,
        category: CollisionCategory,
    ) -> Result<(), ControllerError> {
        if self.physics.has_entity(id) {
            return Err(ControllerError::DuplicateEntity(id));
        }
        self.physics
            .add_part(id, position, rotation_degrees, size, shape, category);
        Ok(())
    }

    /// Adds a character and its capsule body at the character's current position
    pub fn add_character(
        &mut self,
        character: Character,
        category: CollisionCategory,
    ) -> Result<(), ControllerError> {
        let id = character.id();
        if self.physics.has_entity(id) {
            return Err(ControllerError::DuplicateEntity(id));
        }

        let state = character.state();
        let geometry = character.geometry();
        let p = state.position;
        self.physics.add_character(
            id,
            [p.x, p.y, p.z],
            geometry.world_radius(),
            geometry.world_height(),
            category,
        );
        self.physics.set_character_motion(id, state.velocity, state.yaw);
        debug!(character = id, position = ?p, "Character added");

        self.characters.insert(id, character);
        Ok(())
    }

    /// Removes a character and its body; its live projectiles keep flying
    pub fn remove_character(&mut self, id: u64) -> Option<Character> {
        let character = self.characters.remove(&id)?;
        self.physics.remove_entity(id);
        debug!(character = id, "Character removed");
        Some(character)
    }

    pub fn character(&self, id: u64) -> Option<&Character> {
        self.characters.get(&id)
    }

    fn character_mut(&mut self, id: u64) -> Result<&mut Character, ControllerError> {
        self.characters
            .get_mut(&id)
            .ok_or(ControllerError::UnknownCharacter(id))
    }

    /// Queues an action for processing at the start of the next tick
    pub fn queue_action(&self, character_id: u64, action: ActionVector) {
        let _ = self.action_sender.send(QueuedAction {
            character_id,
            action,
        });
    }

    /// A sender other threads can use to queue actions
    pub fn action_sender(&self) -> Sender<QueuedAction> {
        self.action_sender.clone()
    }

    /// Applies an agent action immediately
    pub fn apply_action(&mut self, character_id: u64, action: ActionVector) -> Result<(), ControllerError> {
        self.character_mut(character_id)?.apply_action(action);
        Ok(())
    }

    /// Applies analog human controls immediately
    pub fn apply_human_input(
        &mut self,
        character_id: u64,
        inputs: &ControlInputs,
    ) -> Result<(), ControllerError> {
        self.character_mut(character_id)?.apply_human_input(inputs);
        Ok(())
    }

    pub fn refill_ammo(&mut self, character_id: u64) -> Result<(), ControllerError> {
        self.character_mut(character_id)?.refill_ammo();
        Ok(())
    }

    /// Main loop tick, one fixed timestep
    pub fn tick(&mut self) -> TickReport {
        let dt = self.dt;
        let report = tick_pipeline::run_tick_phases(self, dt);
        self.tick += 1;
        report
    }

    /// Serializable state of every character and projectile
    pub fn snapshot(&self) -> InstanceSnapshot {
        observation::build_snapshot(self)
    }

    /// Applies every action queued since the last tick, in arrival order
    fn drain_actions(&mut self, report: &mut TickReport) {
        while let Ok(queued) = self.action_receiver.try_recv() {
            if let Err(e) = self.apply_action(queued.character_id, queued.action) {
                report.fail(queued.character_id, e);
            }
        }
    }

    /// Copies body position and velocity into each character.
    /// Returns the ids of characters whose body is missing.
    fn sync_characters_from_physics(&mut self) -> Vec<u64> {
        let mut missing = Vec::new();
        for (&id, character) in self.characters.iter_mut() {
            match (self.physics.get_position(id), self.physics.get_velocity(id)) {
                (Some(position), Some(velocity)) => character.sync_from_body(position, velocity),
                _ => missing.push(id),
            }
        }
        missing
    }

    /// Writes controller output to the body and spawns fired projectiles
    fn apply_tick_output(&mut self, id: u64, output: &TickOutput) -> Result<(), ControllerError> {
        if !self.physics.set_character_motion(id, output.velocity, output.yaw) {
            return Err(ControllerError::MissingBody(id));
        }
        for spawn in &output.projectiles {
            let projectile_id = self.next_projectile_id;
            self.next_projectile_id += 1;
            self.projectiles.push(Projectile::spawn(
                projectile_id,
                spawn.owner,
                spawn.position,
                spawn.direction,
                spawn.speed,
            ));
        }
        Ok(())
    }

    /// Advances every projectile and drops the expired ones
    fn tick_projectiles(&mut self, dt: f32) {
        self.projectiles.retain_mut(|projectile| projectile.tick(dt));
    }
}
