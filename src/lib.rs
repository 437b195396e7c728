//! # `momentum_character_controller`
//!
//! A momentum-based 3D character controller driven by a generic finite-state
//! machine, with physics backend abstraction.
//!
//! This crate provides:
//! - A reusable state machine with conditional, event and composite
//!   transition predicates and "from any state" transitions
//! - Grounded/falling/sliding/rising/jumping motion states
//! - Momentum integration with gravity, friction, air control, slope sliding
//!   and a timed jump impulse
//! - Raycast ground sensing that floats a capsule over small steps
//! - Ceiling detection from contact normals
//! - A physics backend trait (Rapier3D included behind the `rapier3d` feature)
//!
//! ## Architecture
//!
//! The controller splits work between Bevy's two clocks:
//! 1. `Update` samples [`MovementIntent`](intent::MovementIntent), feeds
//!    contacts to the [`CeilingDetector`](ceiling::CeilingDetector) and
//!    evaluates state transitions
//! 2. `FixedUpdate` probes the ground, integrates momentum and hands the
//!    resulting velocity to the physics body
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use momentum_character_controller::prelude::*;
//!
//! // Components for a character; spawn them alongside the physics body.
//! let controller = MotionController::new(MotionConfig::default());
//! let sensor = GroundSensor::new(ColliderSettings::default().with_size(1.8, 0.6));
//! let ceiling = CeilingDetector::default();
//! assert_eq!(controller.current_state(), MotionState::Falling);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod ceiling;
pub mod collision;
pub mod config;
pub mod controller;
pub mod detection;
pub mod error;
pub mod ground;
pub mod intent;
pub mod layers;
pub mod state;
pub mod state_machine;
pub mod systems;
pub mod turn;
pub mod vector_math;

#[cfg(feature = "rapier3d")]
pub mod rapier;

#[cfg(test)]
mod test_support;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::ceiling::CeilingDetector;
    pub use crate::collision::{CollisionData, ContactPoint, RayCaster};
    pub use crate::config::{ColliderSettings, MotionConfig};
    pub use crate::controller::{MotionController, MotionEvent};
    pub use crate::detection::{CastDirection, CastShape, RaycastSensor};
    pub use crate::error::ConfigError;
    pub use crate::ground::GroundSensor;
    pub use crate::intent::{MovementIntent, MovementReference};
    pub use crate::layers::{CollisionLayer, LayerCollisionMatrix};
    pub use crate::state::MotionState;
    pub use crate::state_machine::{EventFlag, Predicate, State, StateMachine};
    pub use crate::systems::{probe_character, CharacterContact, CharacterJumped, CharacterLanded};
    pub use crate::turn::TurnToward;
    pub use crate::{ControllerSet, MomentumControllerPlugin};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dBackendPlugin, Rapier3dCharacterBundle};
}

/// System sets of the controller, in execution order within each schedule.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// `Update`: copy intents into controllers.
    Input,
    /// `Update`: feed contacts to ceiling detectors.
    Contacts,
    /// `Update`: evaluate motion state transitions and publish events.
    Transitions,
    /// `Update`: cosmetic systems such as model turning.
    Presentation,
    /// `FixedUpdate`: prepare newly spawned characters.
    Setup,
    /// `FixedUpdate`: probe the ground. Backend plugins add their probe
    /// systems here.
    Probe,
    /// `FixedUpdate`: integrate momentum and set body velocities.
    Motion,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (ground probing, contacts, velocity control).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use momentum_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(MomentumControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct MomentumControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for MomentumControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for MomentumControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::MotionConfig>();
        app.register_type::<ceiling::CeilingDetector>();
        app.register_type::<ground::GroundSensor>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<intent::MovementReference>();
        app.register_type::<layers::CollisionLayer>();
        app.register_type::<layers::LayerCollisionMatrix>();
        app.register_type::<state::MotionState>();
        app.register_type::<turn::TurnToward>();

        app.init_resource::<layers::LayerCollisionMatrix>();
        app.add_message::<systems::CharacterContact>();
        app.add_message::<systems::CharacterJumped>();
        app.add_message::<systems::CharacterLanded>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            Update,
            (
                ControllerSet::Input,
                ControllerSet::Contacts,
                ControllerSet::Transitions,
                ControllerSet::Presentation,
            )
                .chain(),
        );
        app.add_systems(
            Update,
            (
                systems::apply_movement_intent.in_set(ControllerSet::Input),
                systems::detect_ceilings.in_set(ControllerSet::Contacts),
                (systems::update_motion_states, systems::publish_motion_events)
                    .chain()
                    .in_set(ControllerSet::Transitions),
                systems::turn_toward_movement.in_set(ControllerSet::Presentation),
            ),
        );

        // Physics-rate systems in FixedUpdate; the backend's ground probe
        // must precede momentum integration every tick.
        app.configure_sets(
            FixedUpdate,
            (ControllerSet::Setup, ControllerSet::Probe, ControllerSet::Motion).chain(),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::setup_characters::<B>.in_set(ControllerSet::Setup),
                systems::apply_motion::<B>.in_set(ControllerSet::Motion),
            ),
        );
    }
}
