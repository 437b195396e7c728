//! Ceiling contact detection.

use bevy::prelude::*;

use crate::collision::ContactPoint;
use crate::vector_math::angle_between;

/// Records whether the body bumped into a ceiling since the last reset.
///
/// Fed with the contacts the physics engine reports for the body. Only the
/// first contact of each report is examined. The flag is sticky until
/// [`reset`](Self::reset), which the controller calls once per fixed tick.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CeilingDetector {
    /// Maximum angle in degrees between a contact normal and the body's down
    /// axis for the contact to count as a ceiling.
    pub ceiling_angle_limit: f32,
    ceiling_was_hit: bool,
}

impl Default for CeilingDetector {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl CeilingDetector {
    /// Create a detector with the given angular tolerance in degrees.
    pub fn new(ceiling_angle_limit: f32) -> Self {
        Self {
            ceiling_angle_limit,
            ceiling_was_hit: false,
        }
    }

    /// Examine the first contact of a collision report.
    pub fn check_first_contact(&mut self, up: Vec3, contacts: &[ContactPoint]) {
        let Some(first) = contacts.first() else {
            return;
        };
        if angle_between(-up, first.normal) < self.ceiling_angle_limit {
            self.ceiling_was_hit = true;
        }
    }

    /// Whether a ceiling was hit since the last reset.
    #[inline]
    pub fn hit_ceiling(&self) -> bool {
        self.ceiling_was_hit
    }

    /// Clear the hit flag.
    pub fn reset(&mut self) {
        self.ceiling_was_hit = false;
    }
}
