//! Controller configuration components.
//!
//! [`MotionConfig`] tunes the momentum model and the motion state machine.
//! [`ColliderSettings`] describes the capsule the ground sensor is built
//! around. Both can be loaded from RON and are validated before use.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning parameters for the momentum-based motion model.
///
/// Speeds are in units per second, accelerations in units per second squared
/// and angles in degrees.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[serde(default)]
pub struct MotionConfig {
    /// Horizontal movement speed while grounded.
    pub movement_speed: f32,

    /// How quickly input steers horizontal momentum while airborne.
    pub air_control_rate: f32,

    /// Vertical speed applied while in the jumping state.
    pub jump_speed: f32,

    /// Maximum time the jump impulse is sustained, in seconds.
    pub jump_duration: f32,

    /// Horizontal momentum decay while not in the grounded state.
    pub air_friction: f32,

    /// Horizontal momentum decay while grounded.
    pub ground_friction: f32,

    /// Gravitational acceleration along the body's down axis.
    pub gravity: f32,

    /// Down-slope acceleration while sliding.
    pub slide_gravity: f32,

    /// Steepest walkable slope. Steeper ground makes the character slide.
    pub slope_limit: f32,

    /// Store momentum in the body's local frame instead of world space.
    pub use_local_momentum: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            movement_speed: 7.0,
            air_control_rate: 2.0,
            jump_speed: 10.0,
            jump_duration: 0.2,
            air_friction: 0.5,
            ground_friction: 100.0,
            gravity: 30.0,
            slide_gravity: 5.0,
            slope_limit: 30.0,
            use_local_momentum: false,
        }
    }
}

impl MotionConfig {
    /// Parse a configuration from RON and validate it.
    ///
    /// Missing fields take their default values.
    ///
    /// ```rust
    /// use momentum_character_controller::prelude::*;
    ///
    /// let config = MotionConfig::from_ron("(jump_speed: 12.0, slope_limit: 45.0)").unwrap();
    /// assert_eq!(config.jump_speed, 12.0);
    /// assert_eq!(config.movement_speed, 7.0);
    /// ```
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("movement_speed", self.movement_speed),
            ("air_control_rate", self.air_control_rate),
            ("jump_speed", self.jump_speed),
            ("jump_duration", self.jump_duration),
            ("air_friction", self.air_friction),
            ("ground_friction", self.ground_friction),
            ("gravity", self.gravity),
            ("slide_gravity", self.slide_gravity),
        ];
        for (field, value) in non_negative {
            check_finite(field, value)?;
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        check_range("slope_limit", self.slope_limit, 0.0, 90.0)
    }

    /// Builder: set movement speed.
    pub fn with_movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    /// Builder: set air control rate.
    pub fn with_air_control_rate(mut self, rate: f32) -> Self {
        self.air_control_rate = rate;
        self
    }

    /// Builder: set jump speed and duration.
    pub fn with_jump(mut self, speed: f32, duration: f32) -> Self {
        self.jump_speed = speed;
        self.jump_duration = duration;
        self
    }

    /// Builder: set ground and air friction.
    pub fn with_friction(mut self, ground: f32, air: f32) -> Self {
        self.ground_friction = ground;
        self.air_friction = air;
        self
    }

    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set slide gravity.
    pub fn with_slide_gravity(mut self, slide_gravity: f32) -> Self {
        self.slide_gravity = slide_gravity;
        self
    }

    /// Builder: set the slope limit in degrees.
    pub fn with_slope_limit(mut self, degrees: f32) -> Self {
        self.slope_limit = degrees;
        self
    }

    /// Builder: keep momentum in the body's local frame.
    pub fn with_local_momentum(mut self, enabled: bool) -> Self {
        self.use_local_momentum = enabled;
        self
    }
}

/// Capsule dimensions the ground sensor is derived from.
///
/// The lower `step_height_ratio` fraction of `height` is not covered by the
/// collider; the sensor keeps the body floating over it instead, which lets
/// the character ride over small steps.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ColliderSettings {
    /// Fraction of the height reserved for step absorption, in `[0, 1]`.
    pub step_height_ratio: f32,
    /// Full character height, including the step allowance.
    pub height: f32,
    /// Capsule diameter.
    pub thickness: f32,
    /// Collider offset, in multiples of `height`.
    pub offset: Vec3,
}

impl Default for ColliderSettings {
    fn default() -> Self {
        Self {
            step_height_ratio: 0.1,
            height: 2.0,
            thickness: 1.0,
            offset: Vec3::ZERO,
        }
    }
}

impl ColliderSettings {
    /// Parse collider settings from RON and validate them.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let settings: Self = ron::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("step_height_ratio", self.step_height_ratio, 0.0, 1.0)?;
        for (field, value) in [("height", self.height), ("thickness", self.thickness)] {
            check_finite(field, value)?;
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }

    /// Builder: set height and thickness.
    pub fn with_size(mut self, height: f32, thickness: f32) -> Self {
        self.height = height;
        self.thickness = thickness;
        self
    }

    /// Builder: set the step height ratio, clamped to `[0, 1]`.
    pub fn with_step_height_ratio(mut self, ratio: f32) -> Self {
        self.step_height_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the collider offset.
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

fn check_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
