//! Detection result structures.
//!
//! These structures hold the results of physics queries (ray and sphere casts)
//! and contact reports used by the ground sensor and the ceiling detector.

use bevy::prelude::*;

/// Information about a ray or sphere cast hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance from the cast origin to the hit.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// A single contact reported by the physics engine for a character body.
///
/// `normal` points away from the touched surface, toward the character.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    /// World position of the contact.
    pub point: Vec3,
    /// Contact normal, pointing toward the character.
    pub normal: Vec3,
}

impl ContactPoint {
    /// Create a contact point.
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self { point, normal }
    }
}

/// Access to the host engine's scene queries.
///
/// Implementations must never fail: a query that touches nothing returns
/// `None`. Directions are expected to be normalized.
pub trait RayCaster {
    /// Cast a ray and return the closest hit within `max_distance`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<CollisionData>;

    /// Sweep a sphere and return the closest hit within `max_distance`.
    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<CollisionData>;
}
