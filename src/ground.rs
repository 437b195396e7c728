//! Ground sensing.
//!
//! The [`GroundSensor`] keeps a capsule-shaped character floating at a fixed
//! resting height above the ground. It casts down from the capsule center and
//! converts the distance error into a velocity that removes the error within
//! one fixed tick.
//!
//! The cast length uses hysteresis: while grounded the sensor reaches an extra
//! step height further, so small ledges do not make the character flicker
//! between grounded and airborne.

use bevy::prelude::*;

use crate::collision::RayCaster;
use crate::config::ColliderSettings;
use crate::detection::{CastDirection, RaycastSensor};
use crate::layers::{CollisionLayer, LayerCollisionMatrix};

/// Extra range added to the base cast length to avoid clipping at rest.
const SAFETY_DISTANCE_FACTOR: f32 = 0.001;

/// Capsule dimensions derived from [`ColliderSettings`].
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct CapsuleDimensions {
    /// Full capsule height (excluding the step allowance).
    pub height: f32,
    /// Capsule radius, never more than half the height.
    pub radius: f32,
    /// Capsule center in the body's local frame.
    pub center: Vec3,
}

impl CapsuleDimensions {
    /// Half the length of the capsule's inner segment.
    #[inline]
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }
}

/// Ground probe and float-height keeper for a character body.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct GroundSensor {
    settings: ColliderSettings,
    sensor: RaycastSensor,
    capsule: CapsuleDimensions,
    scale: f32,
    base_sensor_range: f32,
    grounded: bool,
    adjustment_velocity: Vec3,
    current_layer: Option<CollisionLayer>,
    extended_range: bool,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self::new(ColliderSettings::default())
    }
}

impl GroundSensor {
    /// Create a sensor for a body with unit scale.
    pub fn new(settings: ColliderSettings) -> Self {
        let mut sensor = Self {
            settings,
            sensor: RaycastSensor::new().with_direction(CastDirection::Down),
            capsule: CapsuleDimensions::default(),
            scale: 1.0,
            base_sensor_range: 0.0,
            grounded: false,
            adjustment_velocity: Vec3::ZERO,
            current_layer: None,
            extended_range: true,
        };
        sensor.recalculate_collider_dimensions(1.0);
        sensor
    }

    /// The collider settings the geometry is derived from.
    pub fn settings(&self) -> &ColliderSettings {
        &self.settings
    }

    /// Replace the collider settings and recompute the geometry.
    pub fn set_settings(&mut self, settings: ColliderSettings) {
        self.settings = settings;
        self.recalculate_collider_dimensions(self.scale);
    }

    /// Current capsule dimensions.
    pub fn capsule(&self) -> CapsuleDimensions {
        self.capsule
    }

    /// Recompute the capsule and recalibrate the probe for the given uniform
    /// body scale.
    ///
    /// The radius is clamped to half the capsule height so the capsule never
    /// degenerates.
    pub fn recalculate_collider_dimensions(&mut self, scale: f32) -> CapsuleDimensions {
        let ColliderSettings {
            step_height_ratio,
            height,
            thickness,
            offset,
        } = self.settings;

        let capsule_height = height * (1.0 - step_height_ratio);
        let radius = (thickness * 0.5).min(capsule_height * 0.5);
        let center = offset * height + Vec3::new(0.0, step_height_ratio * capsule_height * 0.5, 0.0);

        self.capsule = CapsuleDimensions {
            height: capsule_height,
            radius,
            center,
        };
        self.scale = scale;

        self.sensor.set_local_origin(center);
        self.sensor.set_cast_direction(CastDirection::Down);

        let length = height * (1.0 - step_height_ratio) * 0.5 + height * step_height_ratio;
        self.base_sensor_range = length * (1.0 + SAFETY_DISTANCE_FACTOR) * scale;
        self.sensor.cast_length = length * scale;

        self.capsule
    }

    /// Recompute the cast mask if the body changed collision layer.
    ///
    /// Returns `true` when the mask was recomputed.
    pub fn refresh_layer_mask(&mut self, layer: CollisionLayer, matrix: &LayerCollisionMatrix) -> bool {
        if self.current_layer == Some(layer) {
            return false;
        }
        self.sensor.layer_mask = matrix.cast_mask_for(layer);
        self.current_layer = Some(layer);
        true
    }

    /// The cast mask in use.
    pub fn layer_mask(&self) -> u32 {
        self.sensor.layer_mask
    }

    /// Probe the ground below the body.
    ///
    /// Updates the grounded flag and, when grounded, the velocity that moves
    /// the body back to its resting height within `dt`.
    pub fn check_for_ground(&mut self, frame: &Transform, caster: &impl RayCaster, dt: f32) {
        let scale = frame.scale.x;
        if scale != self.scale {
            self.recalculate_collider_dimensions(scale);
        }

        self.adjustment_velocity = Vec3::ZERO;
        self.sensor.cast_length = if self.extended_range {
            self.extended_sensor_range()
        } else {
            self.base_sensor_range
        };
        self.sensor.cast(frame, caster);

        self.grounded = self.sensor.has_detected_hit();
        if !self.grounded {
            return;
        }

        let distance = self.sensor.distance();
        let distance_to_go = self.resting_distance() - distance;
        trace!(distance, distance_to_go, "ground probe hit");

        if dt > 0.0 {
            self.adjustment_velocity = frame.up().as_vec3() * (distance_to_go / dt);
        }
    }

    /// Distance from the cast origin to the ground at which the body rests.
    pub fn resting_distance(&self) -> f32 {
        let ColliderSettings {
            step_height_ratio,
            height,
            ..
        } = self.settings;
        let upper_limit = height * self.scale * (1.0 - step_height_ratio) * 0.5;
        upper_limit + height * self.scale * step_height_ratio
    }

    /// Whether the last probe found ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Ground normal from the last probe, zero when not grounded.
    pub fn ground_normal(&self) -> Vec3 {
        self.sensor.normal()
    }

    /// Distance to the ground from the last probe, `0.0` when not grounded.
    pub fn ground_distance(&self) -> f32 {
        self.sensor.distance()
    }

    /// Entity the character stands on.
    pub fn ground_entity(&self) -> Option<Entity> {
        self.sensor.entity()
    }

    /// Use the extended (grounded) or base (airborne) cast length for the next
    /// probe.
    pub fn set_extended_range(&mut self, extended: bool) {
        self.extended_range = extended;
    }

    /// Whether the next probe uses the extended range.
    pub fn is_using_extended_range(&self) -> bool {
        self.extended_range
    }

    /// Cast length used while airborne.
    pub fn base_sensor_range(&self) -> f32 {
        self.base_sensor_range
    }

    /// Cast length used while grounded.
    pub fn extended_sensor_range(&self) -> f32 {
        self.base_sensor_range + self.settings.height * self.scale * self.settings.step_height_ratio
    }

    /// Cast length of the most recent probe.
    pub fn cast_length(&self) -> f32 {
        self.sensor.cast_length
    }

    /// The pending ground adjustment velocity.
    pub fn adjustment_velocity(&self) -> Vec3 {
        self.adjustment_velocity
    }

    /// Combine `velocity` with the pending ground adjustment.
    ///
    /// The adjustment is consumed: a second call without a new probe returns
    /// `velocity` unchanged.
    pub fn apply_velocity(&mut self, velocity: Vec3) -> Vec3 {
        velocity + std::mem::take(&mut self.adjustment_velocity)
    }

    /// The underlying probe.
    pub fn sensor(&self) -> &RaycastSensor {
        &self.sensor
    }
}
