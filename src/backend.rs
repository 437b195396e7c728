//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to work
//! with the character controller. The controller only needs a way to set a
//! body's velocity and to switch off engine gravity, so swapping physics
//! engines means implementing a handful of functions.
//!
//! Scene queries need the engine's own system parameters, so they live in the
//! backend plugin: it adds a system to [`ControllerSet::Probe`] that wraps the
//! engine's query interface in a [`RayCaster`] and hands it to
//! [`probe_character`].
//!
//! [`ControllerSet::Probe`]: crate::ControllerSet::Probe
//! [`RayCaster`]: crate::collision::RayCaster
//! [`probe_character`]: crate::systems::probe_character

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// All functions are static and receive the ECS world, so backends can read
/// whatever engine components they need.
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`,
/// enabled with the `rapier3d` feature.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    ///
    /// The plugin is responsible for probing the ground in
    /// [`ControllerSet::Probe`](crate::ControllerSet::Probe) and for forwarding
    /// the engine's contacts as
    /// [`CharacterContact`](crate::systems::CharacterContact) messages.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Enable or disable engine gravity for an entity.
    ///
    /// The controller integrates its own gravity and disables the engine's.
    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Get the fixed timestep delta time.
    fn fixed_timestep(world: &World) -> f32;
}
