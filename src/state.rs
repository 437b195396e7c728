//! Character motion states.
//!
//! Each state only forwards its lifecycle to the [`MotionCore`]; all of the
//! physics lives in the controller.

use bevy::prelude::*;

use crate::controller::MotionCore;
use crate::state_machine::State;

/// The motion state of a character.
///
/// Mirrored onto the character entity by the controller systems so other
/// systems can query it without touching the controller.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use momentum_character_controller::prelude::*;
///
/// fn is_airborne(state: &MotionState) -> bool {
///     !state.is_grounded()
/// }
/// assert!(is_airborne(&MotionState::Falling));
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[reflect(Component)]
pub enum MotionState {
    /// Standing or walking on walkable ground.
    Grounded,
    /// Moving down without ground contact.
    #[default]
    Falling,
    /// On ground steeper than the slope limit.
    Sliding,
    /// Moving up without ground contact.
    Rising,
    /// Inside the jump window, vertical speed held at jump speed.
    Jumping,
}

impl MotionState {
    /// All states, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Grounded,
        Self::Falling,
        Self::Sliding,
        Self::Rising,
        Self::Jumping,
    ];

    /// Whether the body is supported by ground: `Grounded` or `Sliding`.
    #[inline]
    pub fn is_grounded(self) -> bool {
        matches!(self, Self::Grounded | Self::Sliding)
    }
}

impl State<MotionCore> for MotionState {
    fn on_enter(self, core: &mut MotionCore) {
        match self {
            Self::Grounded => core.on_ground_contact_regained(),
            Self::Falling => core.on_fall_start(),
            Self::Sliding | Self::Rising => core.on_ground_contact_lost(),
            Self::Jumping => {
                core.on_ground_contact_lost();
                core.on_jump_start();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_states() {
        let grounded: Vec<_> = MotionState::ALL.into_iter().filter(|s| s.is_grounded()).collect();
        assert_eq!(grounded, vec![MotionState::Grounded, MotionState::Sliding]);
    }

    #[test]
    fn falling_is_default() {
        assert_eq!(MotionState::default(), MotionState::Falling);
    }
}
