//! Ground sensing against real Rapier geometry: flat floors, ramps either side
//! of the slope limit, and a character's own capsule in the way of the ray.
//!
//! Run with: cargo test --test ground_sensing_test

use battle_agent::game::instance::character_controller::{sense, CapsuleGeometry};
use battle_agent::game::physics::{CollisionCategory, PartShape, PhysicsWorld};
use nalgebra::Vector3;

const RADIUS: f32 = 0.5;
const HEIGHT: f32 = 2.0;
/// Half thickness of the ramp blocks
const HALF_Y: f32 = 0.5;

fn geometry() -> CapsuleGeometry {
    CapsuleGeometry::new(RADIUS, HEIGHT, 45.0).unwrap()
}

/// A 20x1x20 block centred on the origin, tilted about X.
fn ramp_world(tilt_degrees: f32) -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    world.add_part(
        1,
        [0.0, 0.0, 0.0],
        [tilt_degrees, 0.0, 0.0],
        [20.0, HALF_Y * 2.0, 20.0],
        PartShape::Block,
        CollisionCategory::Static,
    );
    world.update_queries();
    world
}

/// Capsule centre for a character resting tangent on the ramp at x = z = 0.
fn resting_on_ramp(tilt_degrees: f32) -> Vector3<f32> {
    let cos = tilt_degrees.to_radians().cos();
    let sphere_center_y = (HALF_Y + RADIUS) / cos;
    Vector3::new(0.0, sphere_center_y - RADIUS + HEIGHT / 2.0, 0.0)
}

#[test]
fn test_flat_floor_grounded() {
    let world = ramp_world(0.0);
    let sample = sense(&world, resting_on_ramp(0.0), 0.0, &geometry(), None);
    assert!(sample.grounded, "{:?}", sample);
    assert!(sample.normal_angle_degrees.unwrap() < 1.0e-2);
}

#[test]
fn test_walkable_ramp_grounded() {
    for tilt in [15.0, 30.0, 40.0] {
        let world = ramp_world(tilt);
        let sample = sense(&world, resting_on_ramp(tilt), 0.0, &geometry(), None);
        assert!(sample.grounded, "tilt {}: {:?}", tilt, sample);
        assert!((sample.normal_angle_degrees.unwrap() - tilt).abs() < 0.1);
    }
}

#[test]
fn test_steep_ramp_not_grounded() {
    for tilt in [50.0, 55.0] {
        let world = ramp_world(tilt);
        let sample = sense(&world, resting_on_ramp(tilt), 0.0, &geometry(), None);
        assert!(!sample.grounded, "tilt {}: {:?}", tilt, sample);
        // The surface is still seen, it is just too steep.
        assert!(sample.hit_distance.is_some());
    }
}

#[test]
fn test_mid_air_not_grounded() {
    let world = ramp_world(0.0);
    let high = resting_on_ramp(0.0) + Vector3::new(0.0, 10.0, 0.0);
    let sample = sense(&world, high, 0.0, &geometry(), None);
    assert!(!sample.grounded);
    assert_eq!(sample.hit_distance, None);
}

#[test]
fn test_yaw_does_not_change_result() {
    let world = ramp_world(30.0);
    for yaw in [0.0_f32, 1.0, -2.5, std::f32::consts::PI] {
        let sample = sense(&world, resting_on_ramp(30.0), yaw, &geometry(), None);
        assert!(sample.grounded, "yaw {}", yaw);
    }
}

#[test]
fn test_own_capsule_is_excluded() {
    let mut world = ramp_world(0.0);
    let position = resting_on_ramp(0.0);
    world.add_character(
        7,
        [position.x, position.y, position.z],
        RADIUS,
        HEIGHT,
        CollisionCategory::Character,
    );
    world.update_queries();

    let sample = sense(&world, position, 0.0, &geometry(), Some(7));
    assert!(sample.grounded, "{:?}", sample);
    assert!(sample.hit_distance.unwrap() < 0.02);
}

#[test]
fn test_standing_on_another_character_counts_as_ground() {
    let mut world = PhysicsWorld::new();
    // Lower capsule spans y in [0, 2].
    world.add_character(1, [0.0, 1.0, 0.0], RADIUS, HEIGHT, CollisionCategory::Character);
    world.update_queries();

    // Upper capsule bottom rests on the lower capsule's top.
    let upper = Vector3::new(0.0, 3.0, 0.0);
    let sample = sense(&world, upper, 0.0, &geometry(), Some(2));
    assert!(sample.grounded, "{:?}", sample);
}
