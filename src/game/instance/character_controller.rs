use nalgebra::Vector3;

use super::super::constants::ground as ground_consts;
use super::super::physics::{yaw_rotation, RayFilter, WorldQuery};
use crate::config::ConfigError;

/// Capsule collider and slope limit of a character. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleGeometry {
    radius: f32,
    height: f32,
    slope_limit_degrees: f32,
    scale: f32,
}

impl CapsuleGeometry {
    pub fn new(radius: f32, height: f32, slope_limit_degrees: f32) -> Result<Self, ConfigError> {
        Self::with_scale(radius, height, slope_limit_degrees, 1.0)
    }

    /// Geometry under a uniform transform scale.
    pub fn with_scale(
        radius: f32,
        height: f32,
        slope_limit_degrees: f32,
        scale: f32,
    ) -> Result<Self, ConfigError> {
        for (field, value) in [("radius", radius), ("height", height), ("scale", scale)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(ground_consts::MIN_SLOPE_LIMIT_DEGREES..=ground_consts::MAX_SLOPE_LIMIT_DEGREES)
            .contains(&slope_limit_degrees)
        {
            return Err(ConfigError::SlopeLimitOutOfRange(slope_limit_degrees));
        }
        Ok(Self {
            radius,
            height,
            slope_limit_degrees,
            scale,
        })
    }

    /// Collider radius in world units.
    pub fn world_radius(&self) -> f32 {
        self.radius * self.scale
    }

    /// Capsule height in world units; never shorter than the two hemispheres.
    pub fn world_height(&self) -> f32 {
        (self.radius * 2.0).max(self.height) * self.scale
    }

    pub fn slope_limit_degrees(&self) -> f32 {
        self.slope_limit_degrees
    }
}

/// Ground sensor result for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSensorSample {
    pub grounded: bool,
    /// Distance from the ray origin to the surface below, if any was hit
    pub hit_distance: Option<f32>,
    /// Angle in degrees between the hit normal and the body up axis
    pub normal_angle_degrees: Option<f32>,
}

impl GroundSensorSample {
    const AIRBORNE: Self = Self {
        grounded: false,
        hit_distance: None,
        normal_angle_degrees: None,
    };
}

/// Decides whether a downward ray hit counts as standing ground.
///
/// A sphere of radius `r` resting on a plane tilted by `θ` leaves a vertical gap
/// of `r / cos θ - r` between its lowest point and the plane, so the accepted
/// distance grows with the tilt instead of flipping at slope edges.
pub fn classify_ground_hit(
    hit_distance: f32,
    normal_angle_degrees: f32,
    radius: f32,
    slope_limit_degrees: f32,
) -> bool {
    if normal_angle_degrees >= slope_limit_degrees {
        return false;
    }
    let max_distance = radius / normal_angle_degrees.to_radians().cos() - radius
        + ground_consts::STANDOFF_TOLERANCE;
    hit_distance <= max_distance
}

/// Casts the ground ray below a character capsule centred on `position`.
/// `exclude` is the character's own entity id so the ray ignores its collider.
pub fn sense<W: WorldQuery + ?Sized>(
    world: &W,
    position: Vector3<f32>,
    yaw: f32,
    geometry: &CapsuleGeometry,
    exclude: Option<u64>,
) -> GroundSensorSample {
    let up = yaw_rotation(yaw) * Vector3::y();
    let radius = geometry.world_radius();
    let capsule_bottom = position - up * (geometry.world_height() / 2.0);
    let origin = capsule_bottom + up * ground_consts::RAY_ORIGIN_OFFSET;

    let filter = RayFilter {
        exclude,
        category: None,
    };
    let Some(hit) = world.cast_ray(
        origin,
        -up,
        radius * ground_consts::RAY_LENGTH_RADII,
        filter,
    ) else {
        return GroundSensorSample::AIRBORNE;
    };

    let normal = Vector3::new(hit.normal[0], hit.normal[1], hit.normal[2]);
    // A zero normal means the ray started inside the collider: the capsule
    // bottom is embedded in the surface, so treat it as flat contact.
    let normal_angle_degrees = if normal.norm_squared() <= f32::EPSILON {
        0.0
    } else {
        normal.angle(&up).to_degrees()
    };
    GroundSensorSample {
        grounded: classify_ground_hit(
            hit.distance,
            normal_angle_degrees,
            radius,
            geometry.slope_limit_degrees(),
        ),
        hit_distance: Some(hit.distance),
        normal_angle_degrees: Some(normal_angle_degrees),
    }
}
