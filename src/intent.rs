//! Movement intent components.
//!
//! Intents carry the desired movement from player input or AI. The controller
//! samples them every frame; it never polls devices itself.

use bevy::prelude::*;

/// Desired movement for a character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use momentum_character_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_direction(Vec2::new(0.0, 2.0));
/// assert_eq!(intent.direction, Vec2::Y);
///
/// intent.set_jump_pressed(true);
/// assert!(intent.is_jump_pressed());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Planar input: `x` strafes right, `y` moves forward. Each axis in `[-1, 1]`.
    pub direction: Vec2,
    /// Whether the jump action is held.
    ///
    /// Set this every frame from any input source. Press and release edges are
    /// derived by the controller.
    pub jump_pressed: bool,
}

impl MovementIntent {
    /// Create an idle intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planar direction, clamping each axis to `[-1, 1]`.
    pub fn set_direction(&mut self, direction: Vec2) {
        self.direction = direction.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Set whether jump is held.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Whether jump is held.
    pub fn is_jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Whether there is planar input.
    pub fn is_moving(&self) -> bool {
        self.direction.length_squared() > 1e-6
    }

    /// Drop planar input.
    pub fn clear(&mut self) {
        self.direction = Vec2::ZERO;
    }
}

/// Entity whose orientation defines "forward" and "right" for
/// [`MovementIntent`], typically the camera.
///
/// Without it the character's own orientation is used.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct MovementReference(pub Entity);

/// Jump key tracking with press and release edges.
///
/// The lock makes a held key produce exactly one jump: it is set when a jump
/// starts and cleared only by a release.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpInput {
    is_pressed: bool,
    was_pressed: bool,
    was_let_go: bool,
    locked: bool,
}

impl JumpInput {
    /// Feed the current key state.
    pub fn handle_key(&mut self, pressed: bool) {
        if !self.is_pressed && pressed {
            self.was_pressed = true;
        }
        if self.is_pressed && !pressed {
            self.was_let_go = true;
            self.locked = false;
        }
        self.is_pressed = pressed;
    }

    /// Whether the key is held.
    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    /// Whether the key went down since the last edge reset.
    #[inline]
    pub fn was_pressed(&self) -> bool {
        self.was_pressed
    }

    /// Whether the key went up since the last edge reset.
    #[inline]
    pub fn was_let_go(&self) -> bool {
        self.was_let_go
    }

    /// Whether jumps are blocked until the next release.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether a jump should start now.
    pub fn wants_jump(&self) -> bool {
        (self.is_pressed || self.was_pressed) && !self.locked
    }

    /// Block further jumps until release.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Forget press and release edges. Held state and lock are kept.
    pub fn reset_edges(&mut self) {
        self.was_pressed = false;
        self.was_let_go = false;
    }
}
