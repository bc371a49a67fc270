pub mod actions;
pub mod combat;
pub mod constants;
pub mod instance;
pub mod locomotion;
pub mod physics;
pub mod projectile;

pub use instance::GameInstance;
