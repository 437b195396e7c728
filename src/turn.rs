//! Turning a character model toward its movement direction.

use bevy::prelude::*;

use crate::vector_math::{inverse_lerp, project_on_plane, signed_angle};

/// Angle difference, in degrees, at and above which turning runs at full speed.
const FALL_OFF_ANGLE: f32 = 90.0;

/// Yaws a model entity toward the movement velocity of the
/// [`MotionController`](crate::controller::MotionController) on its parent.
///
/// Turning slows down as the model approaches the target heading and snaps
/// when the remaining angle is smaller than one step.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TurnToward {
    /// Turn rate in degrees per second at full speed.
    pub turn_speed: f32,
    yaw: Option<f32>,
}

impl Default for TurnToward {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl TurnToward {
    /// Create with the given turn rate in degrees per second.
    pub fn new(turn_speed: f32) -> Self {
        Self {
            turn_speed,
            yaw: None,
        }
    }

    /// Accumulated yaw in degrees, once turning has started.
    pub fn yaw(&self) -> Option<f32> {
        self.yaw
    }

    /// Advance the turn by `dt`.
    ///
    /// `forward` is the model's current world forward, `up` its parent's up
    /// axis and `local_rotation` its current rotation relative to the parent.
    /// Returns the new local rotation, or `None` when the velocity is too
    /// small to define a heading.
    pub fn turn(&mut self, local_rotation: Quat, forward: Vec3, velocity: Vec3, up: Vec3, dt: f32) -> Option<Quat> {
        let velocity = project_on_plane(velocity, up);
        if velocity.length() < 0.001 {
            return None;
        }

        let difference = signed_angle(forward, velocity.normalize(), up);
        let step = difference.signum()
            * inverse_lerp(0.0, FALL_OFF_ANGLE, difference.abs())
            * self.turn_speed
            * dt;

        let yaw = self
            .yaw
            .get_or_insert_with(|| local_rotation.to_euler(EulerRot::YXZ).0.to_degrees());
        *yaw += if step.abs() > difference.abs() { difference } else { step };

        Some(Quat::from_rotation_y(yaw.to_radians()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn forward_of(rotation: Quat) -> Vec3 {
        rotation * Vec3::NEG_Z
    }

    #[test]
    fn idle_velocity_does_not_turn() {
        let mut turn = TurnToward::default();
        let rotation = turn.turn(Quat::IDENTITY, Vec3::NEG_Z, Vec3::Y * 3.0, Vec3::Y, 0.1);
        assert!(rotation.is_none());
        assert!(turn.yaw().is_none());
    }

    #[test]
    fn full_speed_beyond_fall_off_angle() {
        let mut turn = TurnToward::new(50.0);
        // Velocity straight behind: 180 degrees away.
        let rotation = turn
            .turn(Quat::IDENTITY, Vec3::NEG_Z, Vec3::Z, Vec3::Y, 0.1)
            .unwrap();
        assert_relative_eq!(turn.yaw().unwrap().abs(), 5.0, epsilon = 1e-4);
        assert_relative_eq!(rotation.angle_between(Quat::IDENTITY).to_degrees(), 5.0, epsilon = 1e-2);
    }

    #[test]
    fn slows_down_near_target() {
        let mut turn = TurnToward::new(50.0);
        // 45 degrees to the left: half speed.
        let target = Quat::from_rotation_y(45_f32.to_radians()) * Vec3::NEG_Z;
        turn.turn(Quat::IDENTITY, Vec3::NEG_Z, target, Vec3::Y, 0.1);
        assert_relative_eq!(turn.yaw().unwrap(), 2.5, epsilon = 1e-3);
    }

    #[test]
    fn turns_toward_velocity_side() {
        let mut turn = TurnToward::new(50.0);
        let left = Quat::from_rotation_y(90_f32.to_radians()) * Vec3::NEG_Z;
        turn.turn(Quat::IDENTITY, Vec3::NEG_Z, left, Vec3::Y, 0.1);
        assert!(turn.yaw().unwrap() > 0.0);

        let mut turn = TurnToward::new(50.0);
        let right = Quat::from_rotation_y(-90_f32.to_radians()) * Vec3::NEG_Z;
        turn.turn(Quat::IDENTITY, Vec3::NEG_Z, right, Vec3::Y, 0.1);
        assert!(turn.yaw().unwrap() < 0.0);
    }

    #[test]
    fn snaps_when_step_overshoots() {
        let mut turn = TurnToward::new(10_000.0);
        let target = Quat::from_rotation_y(30_f32.to_radians()) * Vec3::NEG_Z;
        let rotation = turn
            .turn(Quat::IDENTITY, Vec3::NEG_Z, target, Vec3::Y, 0.1)
            .unwrap();
        assert_relative_eq!(turn.yaw().unwrap(), 30.0, epsilon = 1e-3);
        assert_relative_eq!(forward_of(rotation).dot(target), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn converges_over_time() {
        let mut turn = TurnToward::new(360.0);
        let target = Quat::from_rotation_y(120_f32.to_radians()) * Vec3::NEG_Z;
        let mut rotation = Quat::IDENTITY;
        for _ in 0..500 {
            if let Some(next) = turn.turn(rotation, forward_of(rotation), target, Vec3::Y, 0.02) {
                rotation = next;
            }
        }
        assert_relative_eq!(forward_of(rotation).dot(target), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn starts_from_existing_yaw() {
        let mut turn = TurnToward::new(50.0);
        let start = Quat::from_rotation_y(90_f32.to_radians());
        turn.turn(start, forward_of(start), forward_of(start) + Vec3::Z * 0.01, Vec3::Y, 0.1);
        assert_relative_eq!(turn.yaw().unwrap(), 90.0, epsilon = 0.5);
    }
}
