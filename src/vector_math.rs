//! Vector helpers shared by the sensors and the motion controller.
//!
//! Angles are expressed in degrees throughout, matching the units used by
//! [`MotionConfig::slope_limit`](crate::config::MotionConfig::slope_limit) and
//! the ceiling detector's tolerance.

use bevy::prelude::*;

const EPSILON: f32 = 1e-5;

/// Returns the component of `vector` that lies along `direction`.
///
/// `direction` does not need to be normalized. A zero direction yields
/// `Vec3::ZERO`.
///
/// ```rust
/// use bevy::prelude::*;
/// use momentum_character_controller::vector_math::extract_dot_vector;
///
/// let vertical = extract_dot_vector(Vec3::new(3.0, -2.0, 1.0), Vec3::Y * 5.0);
/// assert_eq!(vertical, Vec3::new(0.0, -2.0, 0.0));
/// ```
#[inline]
pub fn extract_dot_vector(vector: Vec3, direction: Vec3) -> Vec3 {
    let direction = direction.normalize_or_zero();
    direction * vector.dot(direction)
}

/// Returns `vector` with its component along `direction` removed.
#[inline]
pub fn remove_dot_vector(vector: Vec3, direction: Vec3) -> Vec3 {
    vector - extract_dot_vector(vector, direction)
}

/// Projects `vector` onto `onto`. Zero when `onto` is degenerate.
#[inline]
pub fn project(vector: Vec3, onto: Vec3) -> Vec3 {
    let length_squared = onto.length_squared();
    if length_squared < EPSILON * EPSILON {
        return Vec3::ZERO;
    }
    onto * (vector.dot(onto) / length_squared)
}

/// Projects `vector` onto the plane defined by `plane_normal`.
///
/// A degenerate normal leaves the vector unchanged.
#[inline]
pub fn project_on_plane(vector: Vec3, plane_normal: Vec3) -> Vec3 {
    vector - project(vector, plane_normal)
}

/// Unsigned angle between two vectors in degrees, in `[0, 180]`.
///
/// Returns `0.0` when either vector is (nearly) zero.
pub fn angle_between(from: Vec3, to: Vec3) -> f32 {
    let denominator = (from.length_squared() * to.length_squared()).sqrt();
    if denominator < EPSILON * EPSILON {
        return 0.0;
    }
    let cos = (from.dot(to) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Signed angle in degrees from `from` to `to`, measured around `axis`.
///
/// Positive when the rotation from `from` to `to` is counter-clockwise when
/// looking down `axis` (right-hand rule).
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let angle = angle_between(from, to);
    let sign = axis.dot(from.cross(to));
    if sign < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Moves `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance < EPSILON {
        return target;
    }
    current + delta / distance * max_delta
}

/// Where `value` lies between `a` and `b`, clamped to `[0, 1]`.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}
