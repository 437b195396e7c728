//! A small, generic finite-state machine.
//!
//! States are identified by a key type implementing [`State`], usually a
//! fieldless enum. The key doubles as the state's behavior: its hooks receive
//! a mutable context `C` owned by the caller, which is also what transition
//! predicates read.
//!
//! Transitions are evaluated only in [`StateMachine::update`]. The fixed-rate
//! [`StateMachine::fixed_update`] only forwards to the current state's hook.
//!
//! ```rust
//! use momentum_character_controller::state_machine::{Predicate, State, StateMachine};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door { Open, Closed }
//! impl State<u32> for Door {}
//!
//! let mut machine = StateMachine::new();
//! machine.add_transition(Door::Closed, Door::Open, Predicate::condition(|pushes: &u32| *pushes > 0));
//! machine.set_state(Door::Closed, &mut 0);
//!
//! machine.update(&mut 1);
//! assert_eq!(machine.current_state(), Some(Door::Open));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy::prelude::*;

/// A state key and its lifecycle hooks.
///
/// All hooks default to doing nothing.
pub trait State<C>: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Called when the machine enters this state.
    fn on_enter(self, _ctx: &mut C) {}

    /// Called when the machine leaves this state.
    fn on_exit(self, _ctx: &mut C) {}

    /// Called every variable-rate update while this state is current.
    fn update(self, _ctx: &mut C) {}

    /// Called every fixed-rate update while this state is current.
    fn fixed_update(self, _ctx: &mut C) {}
}

/// A "fired once" flag raised by an event source and consumed by a predicate.
///
/// Clones share the same flag, so the event source keeps one handle and the
/// transition holds another.
#[derive(Debug, Clone, Default)]
pub struct EventFlag(Arc<AtomicBool>);

impl EventFlag {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag is raised.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Lower the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Boxed condition over the machine's context.
pub type Condition<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// A transition guard.
pub enum Predicate<C> {
    /// Arbitrary condition over the context.
    Condition(Condition<C>),
    /// True once after the flag was raised; evaluation lowers it.
    Event(EventFlag),
    /// True when every nested predicate is true. Short-circuits.
    And(Vec<Predicate<C>>),
    /// True when any nested predicate is true. Short-circuits.
    Or(Vec<Predicate<C>>),
    /// Negation of the nested predicate.
    Not(Box<Predicate<C>>),
}

impl<C> Predicate<C> {
    /// Wrap a closure.
    pub fn condition(condition: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Self::Condition(Box::new(condition))
    }

    /// Guard on a shared event flag.
    pub fn event(flag: &EventFlag) -> Self {
        Self::Event(flag.clone())
    }

    /// All of `predicates`.
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Self {
        Self::And(predicates.into_iter().collect())
    }

    /// Any of `predicates`.
    pub fn any(predicates: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    /// Negation of `predicate`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Self) -> Self {
        Self::Not(Box::new(predicate))
    }

    /// Evaluate against the context.
    pub fn evaluate(&self, ctx: &C) -> bool {
        match self {
            Self::Condition(condition) => condition(ctx),
            Self::Event(flag) => flag.take(),
            Self::And(predicates) => predicates.iter().all(|p| p.evaluate(ctx)),
            Self::Or(predicates) => predicates.iter().any(|p| p.evaluate(ctx)),
            Self::Not(predicate) => !predicate.evaluate(ctx),
        }
    }

    /// Lower every event flag in this predicate tree.
    fn reset_flags(&self) {
        match self {
            Self::Condition(_) => {}
            Self::Event(flag) => flag.reset(),
            Self::And(predicates) | Self::Or(predicates) => {
                predicates.iter().for_each(Self::reset_flags);
            }
            Self::Not(predicate) => predicate.reset_flags(),
        }
    }
}

impl<C> fmt::Debug for Predicate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Condition(_) => f.write_str("Condition(..)"),
            Self::Event(flag) => f.debug_tuple("Event").field(&flag.is_set()).finish(),
            Self::And(predicates) => f.debug_tuple("And").field(predicates).finish(),
            Self::Or(predicates) => f.debug_tuple("Or").field(predicates).finish(),
            Self::Not(predicate) => f.debug_tuple("Not").field(predicate).finish(),
        }
    }
}

struct Transition<K, C> {
    to: K,
    predicate: Predicate<C>,
}

struct StateNode<K, C> {
    transitions: Vec<Transition<K, C>>,
}

impl<K, C> Default for StateNode<K, C> {
    fn default() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }
}

/// Finite-state machine over state keys `K` and a context `C`.
pub struct StateMachine<K, C> {
    current: Option<K>,
    nodes: HashMap<K, StateNode<K, C>>,
    any_transitions: Vec<Transition<K, C>>,
}

impl<K: State<C>, C> Default for StateMachine<K, C> {
    fn default() -> Self {
        Self {
            current: None,
            nodes: HashMap::new(),
            any_transitions: Vec::new(),
        }
    }
}

impl<K: State<C>, C> StateMachine<K, C> {
    /// Create an empty machine with no current state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state, `None` until [`set_state`](Self::set_state).
    #[inline]
    pub fn current_state(&self) -> Option<K> {
        self.current
    }

    /// Whether `state` is current.
    #[inline]
    pub fn is_in(&self, state: K) -> bool {
        self.current == Some(state)
    }

    /// Whether `state` has been registered.
    pub fn contains_state(&self, state: K) -> bool {
        self.nodes.contains_key(&state)
    }

    /// Number of source-scoped transitions registered from `state`.
    pub fn transition_count(&self, state: K) -> usize {
        self.nodes.get(&state).map_or(0, |node| node.transitions.len())
    }

    /// Number of any-state transitions.
    pub fn any_transition_count(&self) -> usize {
        self.any_transitions.len()
    }

    /// Make `state` current and fire its `on_enter` hook.
    ///
    /// No transitions are evaluated and no `on_exit` hook runs.
    pub fn set_state(&mut self, state: K, ctx: &mut C) {
        self.nodes.entry(state).or_default();
        self.current = Some(state);
        state.on_enter(ctx);
    }

    /// Register a transition from `from` to `to`.
    ///
    /// Transitions from the same state are evaluated in registration order.
    pub fn add_transition(&mut self, from: K, to: K, predicate: Predicate<C>) {
        self.nodes.entry(to).or_default();
        self.nodes
            .entry(from)
            .or_default()
            .transitions
            .push(Transition { to, predicate });
    }

    /// Register a transition to `to` that is checked from every state, before
    /// the current state's own transitions.
    pub fn add_any_transition(&mut self, to: K, predicate: Predicate<C>) {
        self.nodes.entry(to).or_default();
        self.any_transitions.push(Transition { to, predicate });
    }

    /// Evaluate transitions, switch state if one fires, then run the current
    /// state's `update` hook.
    ///
    /// Returns the destination of the transition that fired, if any. A
    /// transition to the current state fires no hooks but still counts.
    ///
    /// # Panics
    ///
    /// Panics if called before [`set_state`](Self::set_state).
    pub fn update(&mut self, ctx: &mut C) -> Option<K> {
        let current = self.expect_current();

        let fired = self.find_transition(current, ctx);
        if let Some(to) = fired {
            self.change_state(current, to, ctx);
            self.reset_event_flags();
        }

        self.expect_current().update(ctx);
        fired
    }

    /// Run the current state's `fixed_update` hook.
    ///
    /// # Panics
    ///
    /// Panics if called before [`set_state`](Self::set_state).
    pub fn fixed_update(&mut self, ctx: &mut C) {
        self.expect_current().fixed_update(ctx);
    }

    fn expect_current(&self) -> K {
        let Some(current) = self.current else {
            panic!("state machine used before an initial state was set");
        };
        current
    }

    fn find_transition(&self, current: K, ctx: &C) -> Option<K> {
        let scoped = self
            .nodes
            .get(&current)
            .map(|node| node.transitions.as_slice())
            .unwrap_or_default();

        self.any_transitions
            .iter()
            .chain(scoped)
            .find(|transition| transition.predicate.evaluate(ctx))
            .map(|transition| transition.to)
    }

    fn change_state(&mut self, from: K, to: K, ctx: &mut C) {
        if from == to {
            return;
        }
        debug!(?from, ?to, "state transition");
        from.on_exit(ctx);
        to.on_enter(ctx);
        self.current = Some(to);
    }

    fn reset_event_flags(&self) {
        let scoped = self.nodes.values().flat_map(|node| node.transitions.iter());
        for transition in self.any_transitions.iter().chain(scoped) {
            transition.predicate.reset_flags();
        }
    }
}

impl<K: fmt::Debug, C> fmt::Debug for StateMachine<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("states", &self.nodes.len())
            .field("any_transitions", &self.any_transitions.len())
            .finish()
    }
}
