use nalgebra::Vector3;

use super::actions::ControlInputs;
use super::constants::locomotion as locomotion_consts;
use super::physics::yaw_rotation;

/// Static locomotion tuning for one character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionParams {
    /// Ground speed in m/s
    pub move_speed: f32,
    /// Turn speed in degrees/s, left (+) or right (-)
    pub turn_speed: f32,
    pub allow_jump: bool,
    /// Upward speed added on jump in m/s
    pub jump_speed: f32,
}

/// Velocity and facing produced by one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub velocity: Vector3<f32>,
    /// Facing yaw in radians about the world up axis
    pub yaw: f32,
}

/// Local forward is -Z in the shared physics/render convention.
pub fn forward_from_yaw(yaw: f32) -> Vector3<f32> {
    yaw_rotation(yaw) * Vector3::new(0.0, 0.0, -1.0)
}

pub(crate) fn wrap_angle_signed_pi(angle: f32) -> f32 {
    let two_pi = std::f32::consts::TAU;
    ((angle + std::f32::consts::PI).rem_euclid(two_pi)) - std::f32::consts::PI
}

/// Integrates one tick of control input into velocity and yaw.
///
/// On the ground the result fully replaces the previous velocity. In the air
/// the vertical component is left to the physics engine and only the
/// horizontal part is steered, at reduced speed.
pub fn integrate(
    inputs: &ControlInputs,
    current: Motion,
    grounded: bool,
    params: &LocomotionParams,
    dt: f32,
) -> Motion {
    let turn = inputs.turn.clamp(-1.0, 1.0);
    let yaw = wrap_angle_signed_pi(current.yaw + turn * params.turn_speed.to_radians() * dt);

    let up = Vector3::y();
    let forward = forward_from_yaw(yaw);
    let forward_input = inputs.forward.clamp(-1.0, 1.0);

    let velocity = if grounded {
        let mut velocity = Vector3::zeros();
        if inputs.jump && params.allow_jump {
            velocity += up * params.jump_speed;
        }
        velocity + forward * forward_input * params.move_speed
    } else if inputs.forward.abs() > locomotion_consts::INPUT_EPSILON {
        let vertical = up * current.velocity.dot(&up);
        vertical
            + forward * forward_input * params.move_speed * locomotion_consts::AIR_CONTROL_FACTOR
    } else {
        current.velocity
    };

    Motion { velocity, yaw }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    fn params() -> LocomotionParams {
        LocomotionParams {
            move_speed: 6.0,
            turn_speed: 300.0,
            allow_jump: true,
            jump_speed: 5.0,
        }
    }

    fn moving(velocity: [f32; 3]) -> Motion {
        Motion {
            velocity: Vector3::new(velocity[0], velocity[1], velocity[2]),
            yaw: 0.0,
        }
    }

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).norm() < 1.0e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_grounded_idle_resets_velocity_to_zero() {
        let out = integrate(
            &ControlInputs::default(),
            moving([3.0, -7.0, 12.0]),
            true,
            &params(),
            DT,
        );
        assert_eq!(out.velocity, Vector3::zeros());
    }

    #[test]
    fn test_grounded_forward_moves_along_facing() {
        let inputs = ControlInputs {
            forward: 1.0,
            ..Default::default()
        };
        let out = integrate(&inputs, moving([0.0, 0.0, 0.0]), true, &params(), DT);
        assert_close(out.velocity, Vector3::new(0.0, 0.0, -6.0));
    }

    #[test]
    fn test_grounded_backward_and_clamped_input() {
        let inputs = ControlInputs {
            forward: -4.0,
            ..Default::default()
        };
        let out = integrate(&inputs, moving([0.0, 0.0, 0.0]), true, &params(), DT);
        assert_close(out.velocity, Vector3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn test_jump_adds_upward_speed_when_allowed() {
        let inputs = ControlInputs {
            forward: 1.0,
            jump: true,
            ..Default::default()
        };
        let out = integrate(&inputs, moving([0.0, -1.0, 0.0]), true, &params(), DT);
        assert_close(out.velocity, Vector3::new(0.0, 5.0, -6.0));

        let no_jump = LocomotionParams {
            allow_jump: false,
            ..params()
        };
        let out = integrate(&inputs, moving([0.0, -1.0, 0.0]), true, &no_jump, DT);
        assert_close(out.velocity, Vector3::new(0.0, 0.0, -6.0));
    }

    #[test]
    fn test_jump_ignored_in_air() {
        let inputs = ControlInputs {
            jump: true,
            ..Default::default()
        };
        let out = integrate(&inputs, moving([1.0, -2.0, 0.5]), false, &params(), DT);
        assert_eq!(out.velocity, Vector3::new(1.0, -2.0, 0.5));
    }

    #[test]
    fn test_airborne_without_input_keeps_velocity() {
        let out = integrate(
            &ControlInputs::default(),
            moving([2.0, 4.0, -1.0]),
            false,
            &params(),
            DT,
        );
        assert_eq!(out.velocity, Vector3::new(2.0, 4.0, -1.0));
    }

    #[test]
    fn test_airborne_steering_replaces_horizontal_at_half_speed() {
        let inputs = ControlInputs {
            forward: 1.0,
            ..Default::default()
        };
        let out = integrate(&inputs, moving([2.0, 4.0, 9.0]), false, &params(), DT);
        assert_close(out.velocity, Vector3::new(0.0, 4.0, -3.0));
    }

    #[test]
    fn test_turning_applies_in_both_states() {
        let inputs = ControlInputs {
            turn: 1.0,
            ..Default::default()
        };
        let expected = 300.0_f32.to_radians() * DT;
        for grounded in [true, false] {
            let out = integrate(&inputs, moving([0.0, 0.0, 0.0]), grounded, &params(), DT);
            assert!((out.yaw - expected).abs() < 1.0e-6);
        }

        let right = ControlInputs {
            turn: -2.0,
            ..Default::default()
        };
        let out = integrate(&right, moving([0.0, 0.0, 0.0]), true, &params(), DT);
        assert!((out.yaw + expected).abs() < 1.0e-6);
    }

    #[test]
    fn test_positive_turn_heads_left() {
        // Facing -Z, left is -X.
        let forward = forward_from_yaw(0.1);
        assert!(forward.x < 0.0);
        assert!(forward.z < 0.0);
    }

    #[test]
    fn test_yaw_stays_wrapped() {
        let wrapped = wrap_angle_signed_pi(std::f32::consts::PI + 0.5);
        assert!((wrapped - (0.5 - std::f32::consts::PI)).abs() < 1.0e-5);
        // Half-open: +π maps to -π.
        assert_eq!(wrap_angle_signed_pi(std::f32::consts::PI), -std::f32::consts::PI);
        assert_eq!(wrap_angle_signed_pi(-std::f32::consts::PI), -std::f32::consts::PI);
    }
}
