use serde::Serialize;

use super::character::{Character, ControllerError};
use super::GameInstance;
use crate::game::combat::{FireEvent, WeaponSlot};
use crate::game::locomotion::forward_from_yaw;
use crate::game::projectile::ProjectileSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeaponSnapshot {
    pub count: u32,
    pub max: u32,
    pub cooldown_remaining: f32,
}

impl From<&WeaponSlot> for WeaponSnapshot {
    fn from(slot: &WeaponSlot) -> Self {
        Self {
            count: slot.count(),
            max: slot.max(),
            cooldown_remaining: slot.cooldown_remaining(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSnapshot {
    pub id: u64,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// Facing yaw in radians
    pub yaw: f32,
    /// Unit forward direction for the yaw
    pub facing: [f32; 3],
    pub grounded: bool,
    pub bullets: WeaponSnapshot,
    pub bombs: WeaponSnapshot,
}

impl From<&Character> for CharacterSnapshot {
    fn from(character: &Character) -> Self {
        let state = character.state();
        let facing = forward_from_yaw(state.yaw);
        Self {
            id: character.id(),
            position: [state.position.x, state.position.y, state.position.z],
            velocity: [state.velocity.x, state.velocity.y, state.velocity.z],
            yaw: state.yaw,
            facing: [facing.x, facing.y, facing.z],
            grounded: state.grounded,
            bullets: (&character.ammo().bullets).into(),
            bombs: (&character.ammo().bombs).into(),
        }
    }
}

/// Full instance state after a tick, in character id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub tick: u64,
    pub characters: Vec<CharacterSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
}

/// A fire event tagged with the character that caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterEvent {
    pub character: u64,
    #[serde(flatten)]
    pub event: FireEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterFailure {
    pub character: u64,
    #[serde(serialize_with = "serialize_error")]
    pub error: ControllerError,
}

fn serialize_error<S: serde::Serializer>(error: &ControllerError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// What happened during one tick, beyond the resulting state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub events: Vec<CharacterEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CharacterFailure>,
}

impl TickReport {
    pub(super) fn fail(&mut self, character: u64, error: ControllerError) {
        tracing::warn!(character, %error, "Character failed this tick");
        self.failures.push(CharacterFailure { character, error });
    }
}

pub(super) fn build_snapshot(instance: &GameInstance) -> InstanceSnapshot {
    InstanceSnapshot {
        tick: instance.tick,
        characters: instance.characters.values().map(CharacterSnapshot::from).collect(),
        projectiles: instance.projectiles.iter().map(|p| p.snapshot()).collect(),
    }
}
