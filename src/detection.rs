//! Directional probes.
//!
//! A [`RaycastSensor`] owns a local-space origin and direction relative to the
//! body it is attached to. Each [`cast`](RaycastSensor::cast) resolves both in
//! world space from the body's current transform and stores the result until
//! the next cast.

use bevy::prelude::*;

use crate::collision::{CollisionData, RayCaster};

/// Cast direction expressed in the body's local frame.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CastDirection {
    /// Local forward (`-Z`).
    Forward,
    /// Local right (`+X`).
    Right,
    /// Local up (`+Y`).
    Up,
    /// Local backward (`+Z`).
    Backward,
    /// Local left (`-X`).
    Left,
    /// Local down (`-Y`).
    #[default]
    Down,
}

impl CastDirection {
    /// Resolve the direction in world space for the given body transform.
    pub fn in_frame(self, frame: &Transform) -> Vec3 {
        match self {
            Self::Forward => frame.forward().as_vec3(),
            Self::Right => frame.right().as_vec3(),
            Self::Up => frame.up().as_vec3(),
            Self::Backward => frame.back().as_vec3(),
            Self::Left => frame.left().as_vec3(),
            Self::Down => frame.down().as_vec3(),
        }
    }
}

/// Shape swept by a sensor.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub enum CastShape {
    /// Infinitely thin ray.
    #[default]
    Ray,
    /// Sphere of the given radius.
    Sphere {
        /// Sphere radius in world units.
        radius: f32,
    },
}

/// A directional probe attached to a body.
#[derive(Reflect, Debug, Clone)]
pub struct RaycastSensor {
    /// Maximum cast distance.
    pub cast_length: f32,
    /// Layers the cast can hit.
    pub layer_mask: u32,
    /// Swept shape.
    pub shape: CastShape,
    origin: Vec3,
    direction: CastDirection,
    #[reflect(ignore)]
    hit: Option<CollisionData>,
}

impl Default for RaycastSensor {
    fn default() -> Self {
        Self {
            cast_length: 1.0,
            layer_mask: 0xFF,
            shape: CastShape::Ray,
            origin: Vec3::ZERO,
            direction: CastDirection::Down,
            hit: None,
        }
    }
}

impl RaycastSensor {
    /// Create a downward ray sensor at the body origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the cast shape.
    pub fn with_shape(mut self, shape: CastShape) -> Self {
        self.shape = shape;
        self
    }

    /// Builder: set the cast direction.
    pub fn with_direction(mut self, direction: CastDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Cast from the current origin along the current direction.
    ///
    /// Overwrites the previous result, including with a miss.
    pub fn cast(&mut self, frame: &Transform, caster: &impl RayCaster) {
        let origin = self.world_origin(frame);
        let direction = self.direction.in_frame(frame);

        self.hit = match self.shape {
            CastShape::Ray => caster.cast_ray(origin, direction, self.cast_length, self.layer_mask),
            CastShape::Sphere { radius } => {
                caster.cast_sphere(origin, radius, direction, self.cast_length, self.layer_mask)
            }
        };
    }

    /// Whether the last cast hit anything.
    #[inline]
    pub fn has_detected_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// The last hit, if any.
    #[inline]
    pub fn hit(&self) -> Option<&CollisionData> {
        self.hit.as_ref()
    }

    /// Distance of the last hit, `0.0` on a miss.
    pub fn distance(&self) -> f32 {
        self.hit.map(|h| h.distance).unwrap_or(0.0)
    }

    /// Surface normal of the last hit, zero on a miss.
    pub fn normal(&self) -> Vec3 {
        self.hit.map(|h| h.normal).unwrap_or(Vec3::ZERO)
    }

    /// World position of the last hit, zero on a miss.
    pub fn point(&self) -> Vec3 {
        self.hit.map(|h| h.point).unwrap_or(Vec3::ZERO)
    }

    /// Entity hit by the last cast.
    pub fn entity(&self) -> Option<Entity> {
        self.hit.and_then(|h| h.entity)
    }

    /// Set the cast direction.
    pub fn set_cast_direction(&mut self, direction: CastDirection) {
        self.direction = direction;
    }

    /// The local cast direction.
    pub fn cast_direction(&self) -> CastDirection {
        self.direction
    }

    /// Set the cast origin from a world-space position.
    ///
    /// The position is stored relative to `frame` so the origin follows the
    /// body afterwards.
    pub fn set_cast_origin(&mut self, world_position: Vec3, frame: &Transform) {
        self.origin = frame
            .compute_affine()
            .inverse()
            .transform_point3(world_position);
    }

    /// Set the cast origin directly in local space.
    pub fn set_local_origin(&mut self, local: Vec3) {
        self.origin = local;
    }

    /// The local-space cast origin.
    #[inline]
    pub fn local_origin(&self) -> Vec3 {
        self.origin
    }

    /// The cast origin in world space for the given body transform.
    pub fn world_origin(&self, frame: &Transform) -> Vec3 {
        frame.transform_point(self.origin)
    }
}
