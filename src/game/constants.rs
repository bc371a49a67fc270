//! Controller and physics constants.

/// Physics constants
pub mod physics {
    /// Default gravity in m/s² applied by the physics adapter
    pub const DEFAULT_GRAVITY: f32 = 9.81;

    /// Default fixed tick rate (Hz)
    pub const DEFAULT_TICK_RATE: u32 = 50;
}

/// Ground sensor constants
pub mod ground {
    /// Ray origin lift above the capsule bottom along the body up axis
    pub const RAY_ORIGIN_OFFSET: f32 = 0.01;

    /// Ray length as a multiple of the transformed collider radius
    pub const RAY_LENGTH_RADII: f32 = 5.0;

    /// Extra standoff tolerated on top of the slope-corrected distance
    pub const STANDOFF_TOLERANCE: f32 = 0.02;

    /// Accepted slope limit range in degrees
    pub const MIN_SLOPE_LIMIT_DEGREES: f32 = 5.0;
    pub const MAX_SLOPE_LIMIT_DEGREES: f32 = 60.0;
}

/// Locomotion constants
pub mod locomotion {
    /// Tolerance for treating an analog forward input as released while airborne
    pub const INPUT_EPSILON: f32 = f32::EPSILON * 8.0;

    /// Airborne steering runs at this fraction of ground move speed
    pub const AIR_CONTROL_FACTOR: f32 = 0.5;
}

/// Combat constants
pub mod combat {
    /// Projectile lifetime in seconds
    pub const PROJECTILE_LIFETIME: f32 = 1.0;

    /// Hit-scan reach in world units
    pub const HIT_SCAN_RANGE: f32 = 200.0;
}

/// Character defaults
pub mod character {
    pub const DEFAULT_SLOPE_LIMIT_DEGREES: f32 = 45.0;

    /// Move speed in m/s
    pub const DEFAULT_MOVE_SPEED: f32 = 6.0;

    /// Turn speed in degrees/s, left (+) or right (-)
    pub const DEFAULT_TURN_SPEED: f32 = 300.0;

    /// Upward speed applied on jump in m/s
    pub const DEFAULT_JUMP_SPEED: f32 = 5.0;

    pub const DEFAULT_MAX_BULLETS: u32 = 10;
    pub const DEFAULT_BULLET_COOLDOWN: f32 = 1.0;
    pub const DEFAULT_MAX_BOMBS: u32 = 1;
    pub const DEFAULT_BOMB_COOLDOWN: f32 = 5.0;

    /// Projectile speed in m/s
    pub const DEFAULT_PROJECTILE_SPEED: f32 = 10.0;

    /// Capsule collider radius
    pub const DEFAULT_RADIUS: f32 = 0.5;

    /// Capsule collider total height
    pub const DEFAULT_HEIGHT: f32 = 2.0;
}
