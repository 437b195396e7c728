//! Momentum-based motion controller.
//!
//! [`MotionController`] owns the motion state machine and the [`MotionCore`]
//! its states act on. It is driven from two places each frame:
//!
//! - [`MotionController::update`] at the variable rate: ticks the jump timer and
//!   evaluates state transitions.
//! - [`MotionController::fixed_update`] at the fixed rate: probes the ground,
//!   integrates momentum and returns the velocity to hand to the body.
//!
//! The controller is plain data and can be driven without an ECS, which is how
//! the unit tests below exercise it.

use bevy::prelude::*;

use crate::ceiling::CeilingDetector;
use crate::collision::RayCaster;
use crate::config::MotionConfig;
use crate::ground::GroundSensor;
use crate::intent::{JumpInput, MovementIntent};
use crate::state::MotionState;
use crate::state_machine::{Predicate, StateMachine};
use crate::vector_math::{
    angle_between, extract_dot_vector, move_towards, project, project_on_plane, remove_dot_vector,
};

/// Lifecycle notification raised by the controller.
///
/// Each carries the world-space momentum at the moment of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionEvent {
    /// A jump started.
    Jumped {
        /// Momentum including the jump impulse.
        momentum: Vec3,
    },
    /// The character landed on walkable ground.
    Landed {
        /// Momentum on impact.
        momentum: Vec3,
    },
}

/// The state the motion states act on.
///
/// Holds momentum, jump tracking and the per-tick snapshot of the body frame,
/// ground and ceiling that transition predicates read.
#[derive(Debug, Clone)]
pub struct MotionCore {
    config: MotionConfig,
    /// World space, or body-local when `config.use_local_momentum` is set.
    momentum: Vec3,
    velocity: Vec3,
    movement_velocity: Vec3,
    jump: JumpInput,
    jump_time_left: f32,
    frame: Transform,
    grounded: bool,
    ground_normal: Vec3,
    ceiling_hit: bool,
    input_direction: Vec2,
    reference: Option<Quat>,
    events: Vec<MotionEvent>,
}

impl MotionCore {
    fn new(config: MotionConfig) -> Self {
        Self {
            config,
            momentum: Vec3::ZERO,
            velocity: Vec3::ZERO,
            movement_velocity: Vec3::ZERO,
            jump: JumpInput::default(),
            jump_time_left: 0.0,
            frame: Transform::IDENTITY,
            grounded: false,
            ground_normal: Vec3::ZERO,
            ceiling_hit: false,
            input_direction: Vec2::ZERO,
            reference: None,
            events: Vec::new(),
        }
    }

    /// The body's up axis.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.frame.up().as_vec3()
    }

    /// Momentum in world space.
    pub fn world_momentum(&self) -> Vec3 {
        if self.config.use_local_momentum {
            self.frame.rotation * self.momentum
        } else {
            self.momentum
        }
    }

    fn store_momentum(&mut self, world: Vec3) {
        self.momentum = if self.config.use_local_momentum {
            self.frame.rotation.inverse() * world
        } else {
            world
        };
    }

    /// Whether momentum points up.
    pub fn is_rising(&self) -> bool {
        self.world_momentum().dot(self.up()) > 0.0
    }

    /// Whether momentum points down.
    pub fn is_falling(&self) -> bool {
        self.world_momentum().dot(self.up()) < 0.0
    }

    /// Whether the last ground probe hit.
    #[inline]
    pub fn has_ground_contact(&self) -> bool {
        self.grounded
    }

    /// Whether the ground is missing or steeper than the slope limit.
    ///
    /// A slope exactly at the limit is walkable.
    pub fn is_ground_too_steep(&self) -> bool {
        !self.grounded || angle_between(self.ground_normal, self.up()) > self.config.slope_limit
    }

    /// Ground contact on a walkable slope.
    pub fn is_on_walkable_ground(&self) -> bool {
        self.grounded && !self.is_ground_too_steep()
    }

    /// Ground contact on a slope steeper than the limit.
    pub fn is_on_steep_ground(&self) -> bool {
        self.grounded && self.is_ground_too_steep()
    }

    /// Whether a ceiling was hit since the last fixed tick.
    #[inline]
    pub fn hit_ceiling(&self) -> bool {
        self.ceiling_hit
    }

    /// Whether a jump should start.
    pub fn wants_jump(&self) -> bool {
        self.jump.wants_jump()
    }

    /// Whether the jump window is over.
    pub fn is_jump_timer_finished(&self) -> bool {
        self.jump_time_left <= 0.0
    }

    /// Whether jump was released since the last fixed tick.
    pub fn jump_released(&self) -> bool {
        self.jump.was_let_go()
    }

    /// Input direction in world space, at most unit length.
    ///
    /// Oriented by the movement reference projected onto the body's horizontal
    /// plane, or by the body itself without a reference.
    pub fn movement_direction(&self) -> Vec3 {
        let up = self.up();
        let (right, forward) = match self.reference {
            Some(rotation) => (
                project_on_plane(rotation * Vec3::X, up).normalize_or_zero(),
                project_on_plane(rotation * Vec3::NEG_Z, up).normalize_or_zero(),
            ),
            None => (self.frame.right().as_vec3(), self.frame.forward().as_vec3()),
        };
        let direction = right * self.input_direction.x + forward * self.input_direction.y;
        direction.clamp_length_max(1.0)
    }

    /// Desired planar velocity from input.
    pub fn movement_velocity(&self) -> Vec3 {
        self.movement_direction() * self.config.movement_speed
    }

    /// Replace the vertical part of momentum with the jump speed.
    pub(crate) fn on_jump_start(&mut self) {
        let up = self.up();
        let momentum = remove_dot_vector(self.world_momentum(), up) + up * self.config.jump_speed;
        self.jump_time_left = self.config.jump_duration;
        self.jump.lock();
        debug!(?momentum, "jump started");
        self.events.push(MotionEvent::Jumped { momentum });
        self.store_momentum(momentum);
    }

    /// Fold the last movement velocity into momentum without double counting
    /// the part momentum already carries.
    pub(crate) fn on_ground_contact_lost(&mut self) {
        let mut momentum = self.world_momentum();
        let mut velocity = self.movement_velocity;

        if momentum.length_squared() > 0.0 {
            let heading = velocity.normalize_or_zero();
            let projected = project(momentum, heading);
            let dot = projected.normalize_or_zero().dot(heading);

            if projected.length_squared() >= velocity.length_squared() && dot > 0.0 {
                velocity = Vec3::ZERO;
            } else if dot > 0.0 {
                velocity -= projected;
            }
        }

        momentum += velocity;
        self.store_momentum(momentum);
    }

    pub(crate) fn on_ground_contact_regained(&mut self) {
        let momentum = self.world_momentum();
        debug!(?momentum, "landed");
        self.events.push(MotionEvent::Landed { momentum });
    }

    /// Turn leftover upward momentum into downward momentum.
    pub(crate) fn on_fall_start(&mut self) {
        let up = self.up();
        let momentum = self.world_momentum();
        let upward = extract_dot_vector(momentum, up);
        let momentum = remove_dot_vector(momentum, up) - up * upward.length();
        self.store_momentum(momentum);
    }

    fn tick_jump_timer(&mut self, dt: f32) {
        self.jump_time_left = (self.jump_time_left - dt).max(0.0);
    }

    fn handle_momentum(&mut self, state: MotionState, dt: f32) {
        let up = self.up();
        let momentum = self.world_momentum();

        let mut vertical = extract_dot_vector(momentum, up);
        let mut horizontal = momentum - vertical;

        vertical -= up * (self.config.gravity * dt);
        if state == MotionState::Grounded && vertical.dot(up) < 0.0 {
            vertical = Vec3::ZERO;
        }

        if !state.is_grounded() {
            horizontal = self.adjust_horizontal_momentum(horizontal, self.movement_velocity(), dt);
        }

        if state == MotionState::Sliding {
            horizontal = self.steer_while_sliding(horizontal, dt);
        }

        let friction = if state == MotionState::Grounded {
            self.config.ground_friction
        } else {
            self.config.air_friction
        };
        horizontal = move_towards(horizontal, Vec3::ZERO, friction * dt);

        let mut momentum = horizontal + vertical;

        if state == MotionState::Jumping {
            momentum = remove_dot_vector(momentum, up) + up * self.config.jump_speed;
        }

        if state == MotionState::Sliding {
            momentum = project_on_plane(momentum, self.ground_normal);
            if momentum.dot(up) > 0.0 {
                momentum = remove_dot_vector(momentum, up);
            }
            let slide_direction = project_on_plane(-up, self.ground_normal).normalize_or_zero();
            momentum += slide_direction * (self.config.slide_gravity * dt);
        }

        self.store_momentum(momentum);
    }

    /// Air control. Above movement speed, input can only steer, not speed up.
    fn adjust_horizontal_momentum(&self, horizontal: Vec3, mut movement: Vec3, dt: f32) -> Vec3 {
        let speed = self.config.movement_speed;
        let rate = self.config.air_control_rate;

        if horizontal.length() > speed {
            let heading = horizontal.normalize_or_zero();
            if movement.dot(heading) > 0.0 {
                movement = remove_dot_vector(movement, heading);
            }
            horizontal + movement * (dt * rate * 0.25)
        } else {
            (horizontal + movement * (dt * rate)).clamp_length_max(speed)
        }
    }

    /// Input may steer sideways on a steep slope, never up or down it.
    fn steer_while_sliding(&self, horizontal: Vec3, dt: f32) -> Vec3 {
        let down_slope = project_on_plane(self.ground_normal, self.up()).normalize_or_zero();
        let movement = remove_dot_vector(self.movement_velocity(), down_slope);
        horizontal + movement * dt
    }
}

/// The character's motion controller.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use momentum_character_controller::prelude::*;
///
/// let mut controller = MotionController::new(MotionConfig::default().with_jump(12.0, 0.25));
/// controller.set_input_direction(Vec2::Y);
/// controller.handle_jump_key(true);
/// assert_eq!(controller.current_state(), MotionState::Falling);
/// ```
#[derive(Component, Debug)]
#[require(GroundSensor, MovementIntent)]
pub struct MotionController {
    machine: StateMachine<MotionState, MotionCore>,
    core: MotionCore,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionController {
    /// Create a controller starting in [`MotionState::Falling`].
    pub fn new(config: MotionConfig) -> Self {
        let mut core = MotionCore::new(config);
        let mut machine = StateMachine::new();
        register_transitions(&mut machine);
        machine.set_state(MotionState::Falling, &mut core);
        Self { machine, core }
    }

    /// Current tuning.
    pub fn config(&self) -> &MotionConfig {
        &self.core.config
    }

    /// Replace the tuning, keeping world-space momentum unchanged.
    pub fn set_config(&mut self, config: MotionConfig) {
        let momentum = self.core.world_momentum();
        self.core.config = config;
        self.core.store_momentum(momentum);
    }

    /// The state the motion states act on.
    pub fn core(&self) -> &MotionCore {
        &self.core
    }

    /// Feed the jump key state.
    pub fn handle_jump_key(&mut self, pressed: bool) {
        self.core.jump.handle_key(pressed);
    }

    /// Jump key tracking.
    pub fn jump_input(&self) -> &JumpInput {
        &self.core.jump
    }

    /// Feed planar input: `x` right, `y` forward.
    pub fn set_input_direction(&mut self, direction: Vec2) {
        self.core.input_direction = direction;
    }

    /// Orient input by this rotation instead of the body's.
    pub fn set_movement_reference(&mut self, rotation: Option<Quat>) {
        self.core.reference = rotation;
    }

    /// Snapshot the body frame ahead of the first fixed step.
    ///
    /// The fixed step refreshes the frame every tick. Until then, `up` and
    /// local momentum are measured against this one.
    pub fn set_frame(&mut self, frame: Transform) {
        self.core.frame = frame;
    }

    /// Overwrite momentum, given in world space.
    pub fn set_momentum(&mut self, momentum: Vec3) {
        self.core.store_momentum(momentum);
    }

    /// Variable-rate step: tick the jump timer and evaluate transitions.
    ///
    /// Returns the state entered, if a transition fired.
    pub fn update(&mut self, dt: f32, ceiling: Option<&CeilingDetector>) -> Option<MotionState> {
        self.core.tick_jump_timer(dt);
        self.core.ceiling_hit = ceiling.is_some_and(CeilingDetector::hit_ceiling);
        self.machine.update(&mut self.core)
    }

    /// Fixed-rate step.
    ///
    /// Probes the ground, integrates momentum and returns the velocity to set
    /// on the body, ground adjustment included. Clears the jump edges and the
    /// ceiling flag.
    pub fn fixed_update(
        &mut self,
        frame: &Transform,
        sensor: &mut GroundSensor,
        ceiling: Option<&mut CeilingDetector>,
        caster: &impl RayCaster,
        dt: f32,
    ) -> Vec3 {
        sensor.check_for_ground(frame, caster, dt);
        self.fixed_update_probed(frame, sensor, ceiling, dt)
    }

    /// [`fixed_update`](Self::fixed_update) for a sensor that already probed
    /// the ground this tick.
    pub fn fixed_update_probed(
        &mut self,
        frame: &Transform,
        sensor: &mut GroundSensor,
        ceiling: Option<&mut CeilingDetector>,
        dt: f32,
    ) -> Vec3 {
        self.core.frame = *frame;
        self.core.grounded = sensor.is_grounded();
        self.core.ground_normal = sensor.ground_normal();

        let state = self.current_state();
        self.core.handle_momentum(state, dt);
        self.machine.fixed_update(&mut self.core);

        let movement_velocity = self.core.movement_velocity();
        let mut velocity = if state == MotionState::Grounded {
            movement_velocity
        } else {
            Vec3::ZERO
        };
        velocity += self.core.world_momentum();

        sensor.set_extended_range(state.is_grounded());
        let command = sensor.apply_velocity(velocity);

        self.core.velocity = velocity;
        self.core.movement_velocity = movement_velocity;

        self.core.jump.reset_edges();
        self.core.ceiling_hit = false;
        if let Some(ceiling) = ceiling {
            ceiling.reset();
        }

        command
    }

    /// The current motion state.
    pub fn current_state(&self) -> MotionState {
        self.machine.current_state().unwrap_or_default()
    }

    /// Whether the character is supported by ground.
    pub fn is_grounded(&self) -> bool {
        self.current_state().is_grounded()
    }

    /// Velocity of the last fixed tick, without ground adjustment.
    pub fn velocity(&self) -> Vec3 {
        self.core.velocity
    }

    /// Momentum in world space.
    pub fn momentum(&self) -> Vec3 {
        self.core.world_momentum()
    }

    /// Input velocity of the last fixed tick.
    pub fn movement_velocity(&self) -> Vec3 {
        self.core.movement_velocity
    }

    /// Take the lifecycle events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<MotionEvent> {
        std::mem::take(&mut self.core.events)
    }
}

fn register_transitions(machine: &mut StateMachine<MotionState, MotionCore>) {
    use MotionState::*;

    let rising = || Predicate::condition(MotionCore::is_rising);
    let walkable = || Predicate::condition(MotionCore::is_on_walkable_ground);
    let steep = || Predicate::condition(MotionCore::is_on_steep_ground);
    let airborne = || Predicate::not(Predicate::condition(MotionCore::has_ground_contact));
    let ceiling = || Predicate::condition(MotionCore::hit_ceiling);

    machine.add_transition(Grounded, Rising, rising());
    machine.add_transition(Grounded, Sliding, steep());
    machine.add_transition(Grounded, Falling, airborne());
    machine.add_transition(Grounded, Jumping, Predicate::condition(MotionCore::wants_jump));

    machine.add_transition(Falling, Rising, rising());
    machine.add_transition(Falling, Grounded, walkable());
    machine.add_transition(Falling, Sliding, steep());

    machine.add_transition(Sliding, Rising, rising());
    machine.add_transition(Sliding, Falling, airborne());
    machine.add_transition(Sliding, Grounded, walkable());

    machine.add_transition(Rising, Grounded, walkable());
    machine.add_transition(Rising, Sliding, steep());
    machine.add_transition(Rising, Falling, Predicate::condition(MotionCore::is_falling));
    machine.add_transition(Rising, Falling, ceiling());

    machine.add_transition(
        Jumping,
        Rising,
        Predicate::any([
            Predicate::condition(MotionCore::is_jump_timer_finished),
            Predicate::condition(MotionCore::jump_released),
        ]),
    );
    machine.add_transition(Jumping, Falling, ceiling());
}
