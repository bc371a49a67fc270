//! battle_agent controller library
//!
//! Ground sensing, locomotion and ammo-gated combat for agent-controlled
//! characters in a Rapier world, plus a fixed-timestep instance that runs them.

pub mod config;
pub mod game;
