//! Integration tests for the character controller.
//!
//! These tests drive the full plugin inside a Bevy `App` against a minimal
//! physics backend: an infinite floor plane and bodies that move by their
//! velocity every fixed tick.

use std::time::Duration;

use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use momentum_character_controller::prelude::*;
use momentum_character_controller::systems::setup_characters;

const DT: f32 = 1.0 / 60.0;

fn step() -> Duration {
    Duration::from_secs_f32(DT)
}

// ==================== Test Backend ====================

/// Height of the infinite floor plane.
#[derive(Resource, Clone, Copy)]
struct Floor(f32);

/// Simulated rigid body.
#[derive(Component, Debug, Default)]
struct Body {
    velocity: Vec3,
    gravity: bool,
}

struct FloorCaster(f32);

impl FloorCaster {
    fn sweep(&self, origin: Vec3, radius: f32, direction: Vec3, max: f32, mask: u32) -> Option<CollisionData> {
        if mask & 1 == 0 || direction.y >= 0.0 {
            return None;
        }
        let distance = (origin.y - radius - self.0) / -direction.y;
        if !(0.0..=max).contains(&distance) {
            return None;
        }
        let point = origin + direction * distance - Vec3::Y * radius;
        Some(CollisionData::new(distance, Vec3::Y, point, None))
    }
}

impl RayCaster for FloorCaster {
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

struct FloorBackend;

impl CharacterPhysicsBackend for FloorBackend {
    fn plugin() -> impl Plugin {
        FloorBackendPlugin
    }

    fn velocity(world: &World, entity: Entity) -> Vec3 {
        world.get::<Body>(entity).map(|b| b.velocity).unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<Body>(entity) {
            body.velocity = velocity;
        }
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        if let Some(mut body) = world.get_mut::<Body>(entity) {
            body.gravity = enabled;
        }
    }

    fn fixed_timestep(_world: &World) -> f32 {
        DT
    }
}

struct FloorBackendPlugin;

impl Plugin for FloorBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                probe_floor.in_set(ControllerSet::Probe),
                integrate_bodies.after(ControllerSet::Motion),
            ),
        );
    }
}

fn probe_floor(
    floor: Res<Floor>,
    matrix: Res<LayerCollisionMatrix>,
    mut characters: Query<(Entity, &Transform, &mut GroundSensor, Option<&CollisionLayer>)>,
) {
    let caster = FloorCaster(floor.0);
    for (entity, frame, mut sensor, layer) in &mut characters {
        probe_character(
            entity,
            frame,
            &mut sensor,
            layer.copied().unwrap_or_default(),
            &matrix,
            &caster,
            DT,
        );
    }
}

fn integrate_bodies(mut bodies: Query<(&Body, &mut Transform)>) {
    for (body, mut transform) in &mut bodies {
        transform.translation += body.velocity * DT;
    }
}

// ==================== Harness ====================

#[derive(Resource, Default)]
struct Journal {
    jumped: Vec<CharacterJumped>,
    landed: Vec<CharacterLanded>,
}

fn record_messages(
    mut jumped: MessageReader<CharacterJumped>,
    mut landed: MessageReader<CharacterLanded>,
    mut journal: ResMut<Journal>,
) {
    journal.jumped.extend(jumped.read().copied());
    journal.landed.extend(landed.read().copied());
}

/// Create a minimal test app with the floor backend and the controller.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(MomentumControllerPlugin::<FloorBackend>::default());
    app.insert_resource(Floor(0.0));
    app.insert_resource(Time::<Fixed>::from_duration(step()));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(step()));
    app.init_resource::<Journal>();
    app.add_systems(Update, record_messages.after(ControllerSet::Transitions));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a character with default settings.
fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    spawn_character_with_config(app, position, MotionConfig::default())
}

fn spawn_character_with_config(app: &mut App, position: Vec3, config: MotionConfig) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            MotionController::new(config),
            CeilingDetector::default(),
            Body {
                velocity: Vec3::ZERO,
                gravity: true,
            },
        ))
        .id()
}

/// Run the app for N frames.
fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

/// Run frames until `predicate` holds, up to `limit`.
fn run_until(app: &mut App, limit: usize, predicate: impl Fn(&App) -> bool) -> bool {
    for _ in 0..limit {
        app.update();
        if predicate(app) {
            return true;
        }
    }
    false
}

fn state_of(app: &App, entity: Entity) -> MotionState {
    app.world().get::<MotionController>(entity).unwrap().current_state()
}

fn set_intent(app: &mut App, entity: Entity, direction: Vec2, jump: bool) {
    let mut intent = app.world_mut().get_mut::<MovementIntent>(entity).unwrap();
    intent.set_direction(direction);
    intent.set_jump_pressed(jump);
}

/// Body height at which a default character rests on the floor.
fn resting_height(app: &App, entity: Entity) -> f32 {
    let sensor = app.world().get::<GroundSensor>(entity).unwrap();
    sensor.resting_distance() - sensor.capsule().center.y
}

fn land(app: &mut App, entity: Entity) {
    let landed = run_until(app, 300, |app| state_of(app, entity) == MotionState::Grounded);
    assert!(landed, "character never landed");
    run_frames(app, 10);
}

// ==================== Setup ====================

mod setup {
    use super::*;

    #[test]
    fn engine_gravity_is_disabled() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 5.0, 0.0));

        run_frames(&mut app, 3);

        let body = app.world().get::<Body>(character).unwrap();
        assert!(!body.gravity, "controller must own gravity");
    }

    #[test]
    fn state_mirror_is_attached() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 5.0, 0.0));

        run_frames(&mut app, 3);

        assert_eq!(app.world().get::<MotionState>(character), Some(&MotionState::Falling));
        assert!(app.world().get::<GroundSensor>(character).is_some());
        assert!(app.world().get::<MovementIntent>(character).is_some());
    }

    #[test]
    fn momentum_is_seeded_from_body_velocity() {
        let mut app = create_test_app();
        let character = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 50.0, 0.0),
                MotionController::new(MotionConfig::default()),
                Body {
                    velocity: Vec3::new(4.0, 0.0, 0.0),
                    gravity: true,
                },
            ))
            .id();

        run_frames(&mut app, 3);

        let controller = app.world().get::<MotionController>(character).unwrap();
        assert!(controller.momentum().x > 3.0, "momentum {:?}", controller.momentum());
    }

    #[test]
    fn frame_is_seeded_from_spawn_transform() {
        let mut app = create_test_app();
        let tilt = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let character = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 50.0, 0.0).with_rotation(tilt),
                MotionController::new(MotionConfig::default()),
                Body::default(),
            ))
            .id();

        app.world_mut()
            .run_system_once(setup_characters::<FloorBackend>)
            .unwrap();

        // PROOF: `up` follows the body before any fixed tick refreshed it.
        let controller = app.world().get::<MotionController>(character).unwrap();
        let up = controller.core().up();
        assert!(up.abs_diff_eq(Vec3::NEG_X, 1e-5), "up {up:?}");
    }
}

// ==================== Ground ====================

mod ground {
    use super::*;

    #[test]
    fn falling_character_lands_and_rests() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 4.0, 0.0));

        land(&mut app, character);

        let expected = resting_height(&app, character);
        let transform = app.world().get::<Transform>(character).unwrap();
        assert!(
            (transform.translation.y - expected).abs() < 0.05,
            "resting at {} instead of {}",
            transform.translation.y,
            expected
        );
        let controller = app.world().get::<MotionController>(character).unwrap();
        assert!(controller.momentum().length() < 0.01);
    }

    #[test]
    fn landing_publishes_message() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 4.0, 0.0));

        land(&mut app, character);

        let journal = app.world().resource::<Journal>();
        assert_eq!(journal.landed.len(), 1);
        assert_eq!(journal.landed[0].entity, character);
        assert!(journal.landed[0].momentum.y < 0.0);
    }

    #[test]
    fn ignored_floor_layer_is_not_ground() {
        let mut app = create_test_app();
        app.insert_resource(LayerCollisionMatrix::default().with_ignored(1, 0));
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        app.world_mut().entity_mut(character).insert(CollisionLayer(1));

        run_frames(&mut app, 30);

        assert_eq!(state_of(&app, character), MotionState::Falling);
        let sensor = app.world().get::<GroundSensor>(character).unwrap();
        assert!(!sensor.is_grounded());
    }
}

// ==================== Movement ====================

mod movement {
    use super::*;

    #[test]
    fn walking_moves_along_body_forward() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::Y, false);
        run_frames(&mut app, 30);

        let body = app.world().get::<Body>(character).unwrap();
        let speed = MotionConfig::default().movement_speed;
        assert!((body.velocity.z + speed).abs() < 0.1, "velocity {:?}", body.velocity);
        assert_eq!(state_of(&app, character), MotionState::Grounded);
    }

    #[test]
    fn movement_reference_steers_direction() {
        let mut app = create_test_app();
        let camera = app
            .world_mut()
            .spawn(Transform::from_rotation(Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2)))
            .id();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        app.world_mut().entity_mut(character).insert(MovementReference(camera));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::Y, false);
        run_frames(&mut app, 30);

        // The camera looks down +X.
        let body = app.world().get::<Body>(character).unwrap();
        assert!(body.velocity.x > 6.0, "velocity {:?}", body.velocity);
        assert!(body.velocity.z.abs() < 0.1);
    }

    #[test]
    fn config_component_overrides_controller_config() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        app.world_mut()
            .entity_mut(character)
            .insert(MotionConfig::default().with_movement_speed(2.0));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::Y, false);
        run_frames(&mut app, 30);

        let body = app.world().get::<Body>(character).unwrap();
        assert!((body.velocity.z + 2.0).abs() < 0.1, "velocity {:?}", body.velocity);
    }

    #[test]
    fn invalid_config_component_is_ignored() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        app.world_mut()
            .entity_mut(character)
            .insert(MotionConfig::default().with_movement_speed(-3.0));
        land(&mut app, character);

        let controller = app.world().get::<MotionController>(character).unwrap();
        assert_eq!(controller.config().movement_speed, MotionConfig::default().movement_speed);
    }

    #[test]
    fn model_turns_toward_movement() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        let model = app
            .world_mut()
            .spawn((Transform::default(), TurnToward::new(720.0), ChildOf(character)))
            .id();
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::X, false);
        run_frames(&mut app, 60);

        let transform = app.world().get::<Transform>(model).unwrap();
        let forward = transform.forward().as_vec3();
        assert!(forward.dot(Vec3::X) > 0.99, "forward {forward:?}");
    }
}

// ==================== Jumping ====================

mod jumping {
    use super::*;

    #[test]
    fn jump_rises_then_lands_again() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);
        let start = app.world().get::<Transform>(character).unwrap().translation.y;

        set_intent(&mut app, character, Vec2::ZERO, true);
        let jumped = run_until(&mut app, 10, |app| state_of(app, character) == MotionState::Jumping);
        assert!(jumped);
        set_intent(&mut app, character, Vec2::ZERO, false);

        let mirror = *app.world().get::<MotionState>(character).unwrap();
        assert_eq!(mirror, MotionState::Jumping);

        let states = [MotionState::Rising, MotionState::Falling, MotionState::Grounded];
        for expected in states {
            let reached = run_until(&mut app, 300, |app| state_of(app, character) == expected);
            assert!(reached, "never reached {expected:?}");
        }
        run_frames(&mut app, 30);

        let journal = app.world().resource::<Journal>();
        assert_eq!(journal.jumped.len(), 1);
        assert!(journal.jumped[0].momentum.y > 0.0);
        assert_eq!(journal.landed.len(), 2);

        let end = app.world().get::<Transform>(character).unwrap().translation.y;
        assert!((end - start).abs() < 0.05);
    }

    #[test]
    fn jump_gains_height() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);
        let start = app.world().get::<Transform>(character).unwrap().translation.y;

        set_intent(&mut app, character, Vec2::ZERO, true);
        run_frames(&mut app, 15);

        let height = app.world().get::<Transform>(character).unwrap().translation.y;
        assert!(height > start + 0.5, "only reached {height} from {start}");
    }

    #[test]
    fn holding_jump_jumps_once() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::ZERO, true);
        run_frames(&mut app, 240);

        assert_eq!(state_of(&app, character), MotionState::Grounded);
        let journal = app.world().resource::<Journal>();
        assert_eq!(journal.jumped.len(), 1);
    }

    #[test]
    fn ceiling_contact_ends_jump() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::ZERO, true);
        let jumped = run_until(&mut app, 10, |app| state_of(app, character) == MotionState::Jumping);
        assert!(jumped);

        let head = app.world().get::<Transform>(character).unwrap().translation + Vec3::Y;
        app.world_mut().write_message(CharacterContact {
            entity: character,
            contacts: vec![ContactPoint::new(head, Vec3::NEG_Y)],
        });
        run_frames(&mut app, 1);

        assert_eq!(state_of(&app, character), MotionState::Falling);
        let controller = app.world().get::<MotionController>(character).unwrap();
        assert!(controller.momentum().y <= 0.0);
    }

    #[test]
    fn wall_contact_does_not_end_jump() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.5, 0.0));
        land(&mut app, character);

        set_intent(&mut app, character, Vec2::ZERO, true);
        let jumped = run_until(&mut app, 10, |app| state_of(app, character) == MotionState::Jumping);
        assert!(jumped);

        let side = app.world().get::<Transform>(character).unwrap().translation + Vec3::X * 0.5;
        app.world_mut().write_message(CharacterContact {
            entity: character,
            contacts: vec![ContactPoint::new(side, Vec3::NEG_X)],
        });
        run_frames(&mut app, 1);

        assert_ne!(state_of(&app, character), MotionState::Falling);
    }
}
