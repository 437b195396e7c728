//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::parry::shape::Ball;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::ceiling::CeilingDetector;
use crate::collision::{CollisionData, ContactPoint, RayCaster};
use crate::controller::MotionController;
use crate::ground::GroundSensor;
use crate::layers::{CollisionLayer, LayerCollisionMatrix};
use crate::systems::{probe_character, CharacterContact};
use crate::ControllerSet;

/// Timestep used when `Time<Fixed>` is missing or has not ticked yet.
const FALLBACK_TIMESTEP: f32 = 1.0 / 60.0;

/// Rapier3D physics backend for the character controller.
///
/// This backend uses `bevy_rapier3d` for velocity and gravity control.
/// Collision detection (ground casts, contact forwarding) is handled by
/// dedicated Rapier systems that receive `ReadRapierContext` as a system
/// parameter.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        let scale = if enabled { 1.0 } else { 0.0 };
        if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
            entity_mut.insert(GravityScale(scale));
        }
    }

    fn fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(fixed_delta)
            .unwrap_or(FALLBACK_TIMESTEP)
    }
}

fn fixed_delta(time: &Time<Fixed>) -> f32 {
    Some(time.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(FALLBACK_TIMESTEP)
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                sync_collision_groups.in_set(ControllerSet::Setup),
                rapier_probe_ground.in_set(ControllerSet::Probe),
                rapier_forward_contacts.after(ControllerSet::Motion),
            ),
        );
    }
}

/// Rapier collision groups for a body on `layer`.
///
/// The body is a member of its layer's bit and collides with every layer the
/// matrix does not ignore for it.
pub fn collision_groups_for(layer: CollisionLayer, matrix: &LayerCollisionMatrix) -> CollisionGroups {
    CollisionGroups::new(
        Group::from_bits_truncate(layer.bit()),
        Group::from_bits_truncate(matrix.collision_mask_for(layer)),
    )
}

/// Build a capsule collider matching a ground sensor's geometry.
///
/// The capsule is shifted to the sensor's center so the step allowance below
/// it stays free and the body floats at its resting height.
pub fn capsule_collider(sensor: &GroundSensor) -> Collider {
    let capsule = sensor.capsule();
    Collider::compound(vec![(
        capsule.center,
        Quat::IDENTITY,
        Collider::capsule_y(capsule.half_segment(), capsule.radius),
    )])
}

/// Scene queries against the Rapier context on behalf of one character.
struct RapierCaster<'c> {
    context: &'c RapierContext<'c>,
    exclude: Entity,
}

impl RapierCaster<'_> {
    fn filter(&self, layer_mask: u32) -> QueryFilter<'static> {
        QueryFilter::default()
            .exclude_rigid_body(self.exclude)
            .exclude_collider(self.exclude)
            .exclude_sensors()
            .groups(CollisionGroups::new(Group::ALL, Group::from_bits_truncate(layer_mask)))
    }
}

impl RayCaster for RapierCaster<'_> {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32, layer_mask: u32) -> Option<CollisionData> {
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, self.filter(layer_mask))
            .map(|(hit_entity, hit)| CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity)))
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<CollisionData> {
        let shape = Ball::new(radius);
        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                self.filter(layer_mask),
            )
            .map(|(hit_entity, hit)| {
                let center = origin + direction * hit.time_of_impact;
                let (normal, point) = hit
                    .details
                    .map(|d| (d.normal1, d.witness1))
                    .unwrap_or((-direction, center - direction * radius));
                CollisionData::new(hit.time_of_impact, normal, point, Some(hit_entity))
            })
    }
}

/// Keep each character's Rapier collision groups in step with its layer.
fn sync_collision_groups(
    mut commands: Commands,
    matrix: Res<LayerCollisionMatrix>,
    characters: Query<(Entity, Ref<CollisionLayer>), With<MotionController>>,
) {
    for (entity, layer) in &characters {
        if layer.is_changed() || matrix.is_changed() {
            commands.entity(entity).insert(collision_groups_for(*layer, &matrix));
        }
    }
}

/// Rapier-specific ground probe.
fn rapier_probe_ground(
    rapier_context: ReadRapierContext,
    time: Res<Time<Fixed>>,
    matrix: Res<LayerCollisionMatrix>,
    mut characters: Query<(Entity, &Transform, &mut GroundSensor, Option<&CollisionLayer>), With<MotionController>>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let dt = fixed_delta(&time);

    for (entity, frame, mut sensor, layer) in &mut characters {
        let caster = RapierCaster {
            context: &context,
            exclude: entity,
        };
        probe_character(
            entity,
            frame,
            &mut sensor,
            layer.copied().unwrap_or_default(),
            &matrix,
            &caster,
            dt,
        );
    }
}

/// Forward active contact manifolds of characters as [`CharacterContact`]
/// messages.
///
/// Normals are flipped where needed so they point toward the character.
fn rapier_forward_contacts(
    rapier_context: ReadRapierContext,
    characters: Query<(Entity, &GlobalTransform), (With<MotionController>, With<CeilingDetector>)>,
    mut writer: MessageWriter<CharacterContact>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform) in &characters {
        let center = transform.translation();
        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }

            let mut contacts = Vec::new();
            for manifold in pair.manifolds() {
                for contact in manifold.solver_contacts() {
                    let point = contact.point();
                    let normal = manifold.normal();
                    let normal = if normal.dot(center - point) < 0.0 { -normal } else { normal };
                    contacts.push(ContactPoint::new(point, normal));
                }
            }

            if !contacts.is_empty() {
                trace!(?entity, count = contacts.len(), "forwarding contacts");
                writer.write(CharacterContact { entity, contacts });
            }
        }
    }
}

/// Bundle containing all Rapier physics components needed for a character
/// controller.
///
/// The controller sets the body's velocity directly every fixed tick and
/// integrates its own gravity, so the body is dynamic with rotation locked
/// and engine gravity off.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use momentum_character_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     let sensor = GroundSensor::new(ColliderSettings::default().with_size(1.8, 0.6));
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         MotionController::new(MotionConfig::default()),
///         CeilingDetector::default(),
///         Rapier3dCharacterBundle::for_sensor(&sensor),
///         sensor,
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `gravity_scale`: 0, the controller applies gravity itself
/// - `friction`: 0, so walls do not hold the character while it slides along
/// - `active_events`: [`ActiveEvents::COLLISION_EVENTS`]
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Written by the controller each tick.
    pub velocity: Velocity,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Engine gravity multiplier.
    pub gravity_scale: GravityScale,
    /// Surface friction of the character's collider.
    pub friction: Friction,
    /// Collision events reported for the collider.
    pub active_events: ActiveEvents,
    /// The character's collider.
    pub collider: Collider,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// Create a bundle with a collider for the default [`GroundSensor`].
    pub fn new() -> Self {
        Self::for_sensor(&GroundSensor::default())
    }

    /// Create a bundle whose collider matches `sensor`.
    pub fn for_sensor(sensor: &GroundSensor) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            active_events: ActiveEvents::COLLISION_EVENTS,
            collider: capsule_collider(sensor),
        }
    }

    /// Set the rigid body type for the character.
    ///
    /// ```ignore
    /// let bundle = Rapier3dCharacterBundle::new()
    ///     .with_body(RigidBody::KinematicVelocityBased);
    /// ```
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Replace the collider.
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = collider;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
