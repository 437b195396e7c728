//! Core controller systems.
//!
//! The variable-rate half samples input, feeds contacts to the ceiling
//! detector and evaluates motion state transitions. The fixed-rate half probes
//! the ground, integrates momentum and sets the body velocity. Physics-facing
//! systems are generic over the backend so different engines can be used.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::ceiling::CeilingDetector;
use crate::collision::{ContactPoint, RayCaster};
use crate::config::MotionConfig;
use crate::controller::{MotionController, MotionEvent};
use crate::ground::GroundSensor;
use crate::intent::{MovementIntent, MovementReference};
use crate::layers::{CollisionLayer, LayerCollisionMatrix};
use crate::state::MotionState;
use crate::turn::TurnToward;

/// Contacts the physics engine reported for a character body.
///
/// Written by the backend plugin. Only the first contact of each message is
/// examined by the ceiling detector.
#[derive(Message, Debug, Clone)]
pub struct CharacterContact {
    /// The character.
    pub entity: Entity,
    /// Contact points, normals pointing toward the character.
    pub contacts: Vec<ContactPoint>,
}

/// A character started a jump.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct CharacterJumped {
    /// The character.
    pub entity: Entity,
    /// World-space momentum including the jump impulse.
    pub momentum: Vec3,
}

/// A character landed on walkable ground.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct CharacterLanded {
    /// The character.
    pub entity: Entity,
    /// World-space momentum on impact.
    pub momentum: Vec3,
}

/// Prepare new characters.
///
/// Disables engine gravity, seeds momentum from the body's current velocity
/// and attaches the [`MotionState`] mirror.
pub fn setup_characters<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<MotionController>, Without<MotionState>)>()
        .iter(world)
        .collect();

    for entity in entities {
        B::set_gravity_enabled(world, entity, false);
        let velocity = B::velocity(world, entity);
        let frame = world.get::<Transform>(entity).copied().unwrap_or_default();
        let Some(mut controller) = world.get_mut::<MotionController>(entity) else {
            continue;
        };
        controller.set_frame(frame);
        controller.set_momentum(velocity);
        let state = controller.current_state();
        world.entity_mut(entity).insert(state);
        debug!(?entity, ?velocity, "character controller ready");
    }
}

/// Feed movement intent into the controllers.
pub fn apply_movement_intent(
    mut characters: Query<(&MovementIntent, Option<&MovementReference>, &mut MotionController)>,
    references: Query<&GlobalTransform>,
) {
    for (intent, reference, mut controller) in &mut characters {
        let rotation = reference
            .and_then(|reference| references.get(reference.0).ok())
            .map(|global| global.compute_transform().rotation);

        controller.handle_jump_key(intent.jump_pressed);
        controller.set_input_direction(intent.direction);
        controller.set_movement_reference(rotation);
    }
}

/// Run reported contacts through each character's ceiling detector.
pub fn detect_ceilings(
    mut contacts: MessageReader<CharacterContact>,
    mut detectors: Query<(&Transform, &mut CeilingDetector)>,
) {
    for message in contacts.read() {
        let Ok((transform, mut detector)) = detectors.get_mut(message.entity) else {
            continue;
        };
        detector.check_first_contact(transform.up().as_vec3(), &message.contacts);
    }
}

/// Tick jump timers and evaluate motion state transitions.
pub fn update_motion_states(
    time: Res<Time>,
    mut characters: Query<(&mut MotionController, Option<&CeilingDetector>, &mut MotionState)>,
) {
    let dt = time.delta_secs();
    for (mut controller, ceiling, mut state) in &mut characters {
        if controller.update(dt, ceiling).is_some() {
            state.set_if_neq(controller.current_state());
        }
    }
}

/// Publish jump and landing events as messages.
pub fn publish_motion_events(
    mut characters: Query<(Entity, &mut MotionController)>,
    mut jumped: MessageWriter<CharacterJumped>,
    mut landed: MessageWriter<CharacterLanded>,
) {
    for (entity, mut controller) in &mut characters {
        for event in controller.drain_events() {
            match event {
                MotionEvent::Jumped { momentum } => {
                    jumped.write(CharacterJumped { entity, momentum });
                }
                MotionEvent::Landed { momentum } => {
                    landed.write(CharacterLanded { entity, momentum });
                }
            }
        }
    }
}

/// Probe the ground below one character.
///
/// Refreshes the cached cast mask first if the character changed layer.
/// Backend probe systems call this with a caster over their scene queries.
pub fn probe_character(
    entity: Entity,
    frame: &Transform,
    sensor: &mut GroundSensor,
    layer: CollisionLayer,
    matrix: &LayerCollisionMatrix,
    caster: &impl RayCaster,
    dt: f32,
) {
    if sensor.refresh_layer_mask(layer, matrix) {
        debug!(?entity, layer = layer.0, mask = sensor.layer_mask(), "ground sensor mask updated");
    }
    sensor.check_for_ground(frame, caster, dt);
    trace!(
        ?entity,
        grounded = sensor.is_grounded(),
        distance = sensor.ground_distance(),
        "ground probed"
    );
}

/// Integrate momentum and set each character's velocity.
pub fn apply_motion<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::fixed_timestep(world);

    let mut velocities = Vec::new();
    let mut query = world.query::<(
        Entity,
        &Transform,
        &mut MotionController,
        &mut GroundSensor,
        Option<&mut CeilingDetector>,
        Option<Ref<MotionConfig>>,
    )>();
    for (entity, frame, mut controller, mut sensor, ceiling, config) in query.iter_mut(world) {
        if let Some(config) = config.filter(|config| config.is_changed()) {
            match config.validate() {
                Ok(()) if controller.config() != &*config => controller.set_config(*config),
                Ok(()) => {}
                Err(error) => warn!(?entity, %error, "rejected motion config"),
            }
        }
        let velocity = controller.fixed_update_probed(frame, &mut sensor, ceiling.map(Mut::into_inner), dt);
        velocities.push((entity, velocity));
    }

    for (entity, velocity) in velocities {
        B::set_velocity(world, entity, velocity);
    }
}

/// Yaw character models toward their parent's movement direction.
pub fn turn_toward_movement(
    time: Res<Time>,
    mut models: Query<(&mut TurnToward, &mut Transform, &GlobalTransform, &ChildOf)>,
    characters: Query<(&MotionController, &GlobalTransform)>,
) {
    let dt = time.delta_secs();
    for (mut turn, mut transform, global, child_of) in &mut models {
        let Ok((controller, parent)) = characters.get(child_of.parent()) else {
            continue;
        };
        if let Some(rotation) = turn.turn(
            transform.rotation,
            global.forward().as_vec3(),
            controller.movement_velocity(),
            parent.up().as_vec3(),
            dt,
        ) {
            transform.rotation = rotation;
        }
    }
}
