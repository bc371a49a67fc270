//! Discrete action contract shared by human and policy control.
//!
//! A policy emits five integers per tick:
//!
//! | slot | meaning    | range       |
//! |------|------------|-------------|
//! | 0    | vertical   | `{0, 1, 2}` |
//! | 1    | horizontal | `{0, 1, 2}` |
//! | 2    | jump       | `{0, 1}`    |
//! | 3    | shoot      | `{0, 1}`    |
//! | 4    | throw      | `{0, 1}`    |
//!
//! On the ternary axes `2` stands for "negative". Human input goes through
//! [`ActionVector::encode`] so both controllers reach the character through the
//! same [`ActionVector::decode`]. Trained policies depend on this layout.

use serde::{Deserialize, Serialize};

/// Number of slots in an action vector
pub const ACTION_SLOTS: usize = 5;

const SLOT_NAMES: [&str; ACTION_SLOTS] = ["vertical", "horizontal", "jump", "shoot", "throw"];
const SLOT_MAX: [i32; ACTION_SLOTS] = [2, 2, 1, 1, 1];

/// Symbol for "negative" on a ternary axis
const NEGATIVE_SYMBOL: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action slot {slot} ({name}) out of range: {value} (expected 0..={max})")]
    OutOfRange {
        slot: usize,
        name: &'static str,
        value: i32,
        max: i32,
    },
    #[error("action vector needs 5 slots, got {0}")]
    WrongLength(usize),
}

/// Named control inputs a character consumes each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlInputs {
    /// Forward/backward axis in [-1, 1]
    pub forward: f32,
    /// Turn axis in [-1, 1], positive turns left
    pub turn: f32,
    pub jump: bool,
    pub shoot: bool,
    pub throw: bool,
}

/// Validated 5-slot discrete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "[i32; 5]")]
pub struct ActionVector([i32; ACTION_SLOTS]);

impl ActionVector {
    /// Builds an action vector, rejecting any slot outside its range.
    pub fn new(slots: [i32; ACTION_SLOTS]) -> Result<Self, ActionError> {
        for (slot, (&value, &max)) in slots.iter().zip(SLOT_MAX.iter()).enumerate() {
            if !(0..=max).contains(&value) {
                return Err(ActionError::OutOfRange {
                    slot,
                    name: SLOT_NAMES[slot],
                    value,
                    max,
                });
            }
        }
        Ok(Self(slots))
    }

    pub fn slots(&self) -> [i32; ACTION_SLOTS] {
        self.0
    }

    pub fn vertical(&self) -> i32 {
        self.0[0]
    }

    pub fn horizontal(&self) -> i32 {
        self.0[1]
    }

    /// Agent-to-controller decode.
    pub fn decode(&self) -> ControlInputs {
        ControlInputs {
            forward: decode_axis(self.0[0]),
            turn: decode_axis(self.0[1]),
            jump: self.0[2] > 0,
            shoot: self.0[3] > 0,
            throw: self.0[4] > 0,
        }
    }

    /// Human-to-action encode.
    pub fn encode(inputs: &ControlInputs) -> Self {
        Self([
            encode_axis(inputs.forward),
            encode_axis(inputs.turn),
            inputs.jump as i32,
            inputs.shoot as i32,
            inputs.throw as i32,
        ])
    }
}

impl TryFrom<[i32; ACTION_SLOTS]> for ActionVector {
    type Error = ActionError;

    fn try_from(slots: [i32; ACTION_SLOTS]) -> Result<Self, Self::Error> {
        Self::new(slots)
    }
}

impl TryFrom<Vec<i32>> for ActionVector {
    type Error = ActionError;

    fn try_from(slots: Vec<i32>) -> Result<Self, Self::Error> {
        let len = slots.len();
        let slots: [i32; ACTION_SLOTS] = slots
            .try_into()
            .map_err(|_| ActionError::WrongLength(len))?;
        Self::new(slots)
    }
}

impl From<ActionVector> for [i32; ACTION_SLOTS] {
    fn from(action: ActionVector) -> Self {
        action.0
    }
}

fn decode_axis(raw: i32) -> f32 {
    if raw <= 1 {
        raw as f32
    } else {
        -1.0
    }
}

/// Rounds to the nearest symbol. The axis is clamped first so large analog
/// values cannot round onto the "negative" symbol.
fn encode_axis(value: f32) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let rounded = value.clamp(-1.0, 1.0).round_ties_even() as i32;
    if rounded >= 0 {
        rounded
    } else {
        NEGATIVE_SYMBOL
    }
}

/// An action queued for a character, consumed at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub character_id: u64,
    pub action: ActionVector,
}
