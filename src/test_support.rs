//! Scene query doubles for unit tests.

use bevy::prelude::*;

use crate::collision::{CollisionData, RayCaster};

/// An infinite one-sided plane on layer 0.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaneCaster {
    pub point: Vec3,
    pub normal: Vec3,
}

impl PlaneCaster {
    /// Horizontal ground at the given height.
    pub fn flat(height: f32) -> Self {
        Self {
            point: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
        }
    }

    /// Ground through the origin, tilted by `degrees` around the Z axis.
    pub fn tilted(degrees: f32) -> Self {
        Self {
            point: Vec3::ZERO,
            normal: Quat::from_rotation_z(degrees.to_radians()) * Vec3::Y,
        }
    }

    fn sweep(&self, origin: Vec3, radius: f32, direction: Vec3, max: f32, mask: u32) -> Option<CollisionData> {
        if mask & 1 == 0 {
            return None;
        }
        let approach = direction.dot(self.normal);
        if approach >= 0.0 {
            return None;
        }
        let height = (origin - self.point).dot(self.normal);
        let distance = (radius - height) / approach;
        if !(0.0..=max).contains(&distance) {
            return None;
        }
        let center = origin + direction * distance;
        Some(CollisionData::new(
            distance,
            self.normal,
            center - self.normal * radius,
            None,
        ))
    }
}

impl RayCaster for PlaneCaster {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32, layer_mask: u32) -> Option<CollisionData> {
        self.sweep(origin, 0.0, direction, max_distance, layer_mask)
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<CollisionData> {
        self.sweep(origin, radius, direction, max_distance, layer_mask)
    }
}
