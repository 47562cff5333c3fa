//! Machine schemas.
//!
//! A [`Schema`] is the immutable, author-supplied description of one
//! component's behavior: its states, transition tables, entry/exit actions,
//! effects, context defaults, computed values and the implementations every
//! symbolic name resolves to. Schemas are built once with [`SchemaBuilder`],
//! validated, and shared read-only (via `Arc`) by any number of services.

pub mod builder;
pub mod error;
pub mod macros;
pub mod transition;
mod validate;

pub use builder::SchemaBuilder;
pub use error::{BuildError, SchemaViolation};
pub use transition::Transition;

use crate::context::{Context, ContextFields, MachineContext};
use crate::core::{Event, GuardFn, MachineTypes};
use crate::scope::Scope;
use crate::service::{Cleanup, ComputedParams, MachineError, Params};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Action implementation.
pub type ActionFn<T> = Arc<dyn Fn(&Params<'_, T>) + Send + Sync>;

/// Effect implementation, optionally returning a cleanup.
pub type EffectFn<T> = Arc<dyn Fn(&Params<'_, T>) -> Option<Cleanup> + Send + Sync>;

/// Computed value implementation.
pub type ComputedFn<T> =
    Arc<dyn Fn(&ComputedParams<'_, T>) -> <T as MachineTypes>::Value + Send + Sync>;

/// Context factory: declared fields for one service.
pub type ContextFn<T> =
    Arc<dyn Fn(&<T as MachineTypes>::Props, &Scope) -> ContextFields<T> + Send + Sync>;

/// Initial state selector.
pub type InitialStateFn<T> =
    Arc<dyn Fn(&<T as MachineTypes>::Props) -> <T as MachineTypes>::State + Send + Sync>;

/// Props normalizer applied to user props.
pub type PropsFn<T> =
    Arc<dyn Fn(<T as MachineTypes>::Props, &Scope) -> <T as MachineTypes>::Props + Send + Sync>;

/// Refs factory.
pub type RefsFn<T> = Arc<
    dyn Fn(&<T as MachineTypes>::Props, &MachineContext<T>) -> <T as MachineTypes>::Refs
        + Send
        + Sync,
>;

/// Hook called once per activation.
pub type WatchFn<T> = Arc<dyn Fn(&Params<'_, T>) + Send + Sync>;

type KeysFn<T, K> = Arc<dyn Fn(&Params<'_, T>) -> Vec<K> + Send + Sync>;

type TransitionTable<T> = HashMap<<<T as MachineTypes>::Event as Event>::Kind, Vec<Transition<T>>>;

/// A list of symbolic names, literal or computed at dispatch time.
pub enum KeysOrFn<T: MachineTypes, K> {
    Keys(Vec<K>),
    Fn(KeysFn<T, K>),
}

/// Action names.
pub type Actions<T> = KeysOrFn<T, <T as MachineTypes>::Action>;

/// Effect names.
pub type Effects<T> = KeysOrFn<T, <T as MachineTypes>::Effect>;

impl<T: MachineTypes, K: Clone> KeysOrFn<T, K> {
    pub fn keys(keys: impl IntoIterator<Item = K>) -> Self {
        KeysOrFn::Keys(keys.into_iter().collect())
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Vec<K> + Send + Sync + 'static,
    {
        KeysOrFn::Fn(Arc::new(f))
    }

    /// The names to run for this dispatch.
    pub fn resolve(&self, params: &Params<'_, T>) -> Vec<K> {
        match self {
            KeysOrFn::Keys(keys) => keys.clone(),
            KeysOrFn::Fn(f) => f(params),
        }
    }

    /// Names known without running anything; empty for computed lists.
    pub fn literal(&self) -> &[K] {
        match self {
            KeysOrFn::Keys(keys) => keys,
            KeysOrFn::Fn(_) => &[],
        }
    }
}

impl<T: MachineTypes, K> Default for KeysOrFn<T, K> {
    fn default() -> Self {
        KeysOrFn::Keys(Vec::new())
    }
}

impl<T: MachineTypes, K: Clone> Clone for KeysOrFn<T, K> {
    fn clone(&self) -> Self {
        match self {
            KeysOrFn::Keys(keys) => KeysOrFn::Keys(keys.clone()),
            KeysOrFn::Fn(f) => KeysOrFn::Fn(Arc::clone(f)),
        }
    }
}

impl<T: MachineTypes, K: fmt::Debug> fmt::Debug for KeysOrFn<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeysOrFn::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            KeysOrFn::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Configuration of one declared state.
pub struct StateNode<T: MachineTypes> {
    on: TransitionTable<T>,
    entry: Option<Actions<T>>,
    exit: Option<Actions<T>>,
    effects: Option<Effects<T>>,
    tags: Vec<T::Tag>,
}

impl<T: MachineTypes> StateNode<T> {
    pub fn new() -> Self {
        Self {
            on: HashMap::new(),
            entry: None,
            exit: None,
            effects: None,
            tags: Vec::new(),
        }
    }

    /// Append a candidate for `kind`. Candidates are tried in the order added.
    pub fn on(mut self, kind: <T::Event as Event>::Kind, transition: Transition<T>) -> Self {
        self.on.entry(kind).or_default().push(transition);
        self
    }

    pub fn entry(mut self, actions: impl IntoIterator<Item = T::Action>) -> Self {
        self.entry = Some(Actions::keys(actions));
        self
    }

    pub fn entry_fn<F>(mut self, actions: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Vec<T::Action> + Send + Sync + 'static,
    {
        self.entry = Some(Actions::from_fn(actions));
        self
    }

    pub fn exit(mut self, actions: impl IntoIterator<Item = T::Action>) -> Self {
        self.exit = Some(Actions::keys(actions));
        self
    }

    pub fn exit_fn<F>(mut self, actions: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Vec<T::Action> + Send + Sync + 'static,
    {
        self.exit = Some(Actions::from_fn(actions));
        self
    }

    pub fn effects(mut self, effects: impl IntoIterator<Item = T::Effect>) -> Self {
        self.effects = Some(Effects::keys(effects));
        self
    }

    pub fn effects_fn<F>(mut self, effects: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Vec<T::Effect> + Send + Sync + 'static,
    {
        self.effects = Some(Effects::from_fn(effects));
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = T::Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Candidates for `kind`, if this state declares the event at all.
    pub fn transitions(&self, kind: &<T::Event as Event>::Kind) -> Option<&[Transition<T>]> {
        self.on.get(kind).map(Vec::as_slice)
    }

    pub fn entry_actions(&self) -> Option<&Actions<T>> {
        self.entry.as_ref()
    }

    pub fn exit_actions(&self) -> Option<&Actions<T>> {
        self.exit.as_ref()
    }

    pub fn state_effects(&self) -> Option<&Effects<T>> {
        self.effects.as_ref()
    }

    pub fn has_tag(&self, tag: &T::Tag) -> bool {
        self.tags.contains(tag)
    }

    pub(crate) fn table(&self) -> &TransitionTable<T> {
        &self.on
    }
}

impl<T: MachineTypes> Default for StateNode<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implementations of every symbolic action, guard and effect name.
pub struct Implementations<T: MachineTypes> {
    actions: HashMap<T::Action, ActionFn<T>>,
    guards: HashMap<T::Guard, GuardFn<T>>,
    effects: HashMap<T::Effect, EffectFn<T>>,
}

impl<T: MachineTypes> Implementations<T> {
    pub(crate) fn new() -> Self {
        Self {
            actions: HashMap::new(),
            guards: HashMap::new(),
            effects: HashMap::new(),
        }
    }

    pub fn action(&self, name: &T::Action) -> Option<&ActionFn<T>> {
        self.actions.get(name)
    }

    pub fn guard(&self, name: &T::Guard) -> Option<&GuardFn<T>> {
        self.guards.get(name)
    }

    pub fn effect(&self, name: &T::Effect) -> Option<&EffectFn<T>> {
        self.effects.get(name)
    }
}

/// Immutable machine description.
pub struct Schema<T: MachineTypes> {
    pub(crate) states: HashMap<T::State, StateNode<T>>,
    pub(crate) on: TransitionTable<T>,
    pub(crate) entry: Option<Actions<T>>,
    pub(crate) exit: Option<Actions<T>>,
    pub(crate) effects: Option<Effects<T>>,
    pub(crate) context: Option<ContextFn<T>>,
    pub(crate) computed: Option<HashMap<T::Computed, ComputedFn<T>>>,
    pub(crate) implementations: Implementations<T>,
    pub(crate) initial_state: InitialStateFn<T>,
    pub(crate) props: Option<PropsFn<T>>,
    pub(crate) refs: Option<RefsFn<T>>,
    pub(crate) watch: Option<WatchFn<T>>,
}

impl<T: MachineTypes> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder::new()
    }

    /// Configuration of a declared state.
    pub fn state(&self, state: &T::State) -> Option<&StateNode<T>> {
        self.states.get(state)
    }

    pub fn is_declared(&self, state: &T::State) -> bool {
        self.states.contains_key(state)
    }

    pub fn states(&self) -> impl Iterator<Item = &T::State> {
        self.states.keys()
    }

    /// Candidates for `kind` while in `state`.
    ///
    /// The active state's table wins whenever it declares `kind`, even if
    /// none of its candidates will pass their guards; the machine-level
    /// table is consulted only otherwise.
    pub fn transitions_for(
        &self,
        state: &T::State,
        kind: &<T::Event as Event>::Kind,
    ) -> &[Transition<T>] {
        self.state(state)
            .and_then(|node| node.transitions(kind))
            .or_else(|| self.on.get(kind).map(Vec::as_slice))
            .unwrap_or(&[])
    }

    pub fn entry(&self) -> Option<&Actions<T>> {
        self.entry.as_ref()
    }

    pub fn exit(&self) -> Option<&Actions<T>> {
        self.exit.as_ref()
    }

    pub fn effects(&self) -> Option<&Effects<T>> {
        self.effects.as_ref()
    }

    pub fn implementations(&self) -> &Implementations<T> {
        &self.implementations
    }

    pub fn watch(&self) -> Option<&WatchFn<T>> {
        self.watch.as_ref()
    }

    /// The computed function for `key`.
    pub fn computed_fn(&self, key: &T::Computed) -> Result<&ComputedFn<T>, MachineError> {
        let computed = self
            .computed
            .as_ref()
            .ok_or(MachineError::MissingComputedMap)?;
        computed.get(key).ok_or_else(|| MachineError::MissingComputed {
            key: format!("{key:?}"),
        })
    }

    pub fn initial_state(&self, props: &T::Props) -> T::State {
        (self.initial_state)(props)
    }

    pub(crate) fn normalize_props(&self, props: T::Props, scope: &Scope) -> T::Props {
        match &self.props {
            Some(normalize) => normalize(props, scope),
            None => props,
        }
    }

    pub(crate) fn create_context(&self, props: &T::Props, scope: &Scope) -> MachineContext<T> {
        match &self.context {
            Some(factory) => Context::new(factory(props, scope)),
            None => Context::empty(),
        }
    }

    pub(crate) fn create_refs(&self, props: &T::Props, context: &MachineContext<T>) -> T::Refs {
        match &self.refs {
            Some(factory) => factory(props, context),
            None => T::Refs::default(),
        }
    }
}

impl<T: MachineTypes> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("actions", &self.implementations.actions.len())
            .field("guards", &self.implementations.guards.len())
            .field("effects", &self.implementations.effects.len())
            .field("computed", &self.computed.as_ref().map(HashMap::len))
            .finish_non_exhaustive()
    }
}
