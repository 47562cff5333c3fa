//! Builder for constructing machine schemas.

use crate::context::{ContextFields, MachineContext};
use crate::core::{Event, MachineTypes};
use crate::schema::error::BuildError;
use crate::schema::validate;
use crate::schema::{
    Actions, ComputedFn, ContextFn, Effects, Implementations, InitialStateFn, PropsFn, RefsFn,
    Schema, StateNode, Transition, WatchFn,
};
use crate::scope::Scope;
use crate::service::{Cleanup, ComputedParams, Params};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing schemas with a fluent API.
///
/// `build` validates every symbolic reference and every transition target,
/// reporting all problems at once.
pub struct SchemaBuilder<T: MachineTypes> {
    initial: Option<InitialStateFn<T>>,
    states: Vec<(T::State, StateNode<T>)>,
    on: HashMap<<T::Event as Event>::Kind, Vec<Transition<T>>>,
    entry: Option<Actions<T>>,
    exit: Option<Actions<T>>,
    effects: Option<Effects<T>>,
    context: Option<ContextFn<T>>,
    computed: Option<HashMap<T::Computed, ComputedFn<T>>>,
    implementations: Implementations<T>,
    props: Option<PropsFn<T>>,
    refs: Option<RefsFn<T>>,
    watch: Option<WatchFn<T>>,
}

impl<T: MachineTypes> SchemaBuilder<T> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            states: Vec::new(),
            on: HashMap::new(),
            entry: None,
            exit: None,
            effects: None,
            context: None,
            computed: None,
            implementations: Implementations::new(),
            props: None,
            refs: None,
            watch: None,
        }
    }

    /// Fixed initial state.
    pub fn initial(self, state: T::State) -> Self {
        self.initial_fn(move |_| state.clone())
    }

    /// Initial state chosen from the props (required unless `initial` is used).
    pub fn initial_fn<F>(mut self, select: F) -> Self
    where
        F: Fn(&T::Props) -> T::State + Send + Sync + 'static,
    {
        self.initial = Some(Arc::new(select));
        self
    }

    /// Declare a state. Declaring the same state again replaces its node.
    pub fn state(mut self, state: T::State, node: StateNode<T>) -> Self {
        match self.states.iter_mut().find(|(existing, _)| *existing == state) {
            Some(slot) => slot.1 = node,
            None => self.states.push((state, node)),
        }
        self
    }

    /// Append a machine-level candidate, used when the active state does not
    /// declare `kind`.
    pub fn on(mut self, kind: <T::Event as Event>::Kind, transition: Transition<T>) -> Self {
        self.on.entry(kind).or_default().push(transition);
        self
    }

    /// Root entry actions, run once per activation.
    pub fn entry(mut self, actions: impl IntoIterator<Item = T::Action>) -> Self {
        self.entry = Some(Actions::keys(actions));
        self
    }

    /// Root exit actions, run when the service stops.
    pub fn exit(mut self, actions: impl IntoIterator<Item = T::Action>) -> Self {
        self.exit = Some(Actions::keys(actions));
        self
    }

    /// Root effects, active for the whole activation.
    pub fn effects(mut self, effects: impl IntoIterator<Item = T::Effect>) -> Self {
        self.effects = Some(Effects::keys(effects));
        self
    }

    /// Context factory.
    pub fn context<F>(mut self, factory: F) -> Self
    where
        F: Fn(&T::Props, &Scope) -> ContextFields<T> + Send + Sync + 'static,
    {
        self.context = Some(Arc::new(factory));
        self
    }

    /// Register a computed value.
    pub fn computed<F>(mut self, key: T::Computed, compute: F) -> Self
    where
        F: Fn(&ComputedParams<'_, T>) -> T::Value + Send + Sync + 'static,
    {
        let compute: ComputedFn<T> = Arc::new(compute);
        self.computed
            .get_or_insert_with(HashMap::new)
            .insert(key, compute);
        self
    }

    /// Register an action implementation.
    pub fn action<F>(mut self, name: T::Action, action: F) -> Self
    where
        F: Fn(&Params<'_, T>) + Send + Sync + 'static,
    {
        self.implementations
            .actions
            .insert(name, Arc::new(action));
        self
    }

    /// Register a guard implementation.
    pub fn guard<F>(mut self, name: T::Guard, guard: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> bool + Send + Sync + 'static,
    {
        self.implementations
            .guards
            .insert(name, Arc::new(guard));
        self
    }

    /// Register an effect implementation.
    pub fn effect<F>(mut self, name: T::Effect, effect: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Option<Cleanup> + Send + Sync + 'static,
    {
        self.implementations
            .effects
            .insert(name, Arc::new(effect));
        self
    }

    /// Normalize user props before anything else sees them.
    pub fn props<F>(mut self, normalize: F) -> Self
    where
        F: Fn(T::Props, &Scope) -> T::Props + Send + Sync + 'static,
    {
        self.props = Some(Arc::new(normalize));
        self
    }

    /// Refs factory.
    pub fn refs<F>(mut self, factory: F) -> Self
    where
        F: Fn(&T::Props, &MachineContext<T>) -> T::Refs + Send + Sync + 'static,
    {
        self.refs = Some(Arc::new(factory));
        self
    }

    /// Hook called once per activation, after the initial state is entered.
    pub fn watch<F>(mut self, watch: F) -> Self
    where
        F: Fn(&Params<'_, T>) + Send + Sync + 'static,
    {
        self.watch = Some(Arc::new(watch));
        self
    }

    /// Build the schema.
    /// Returns an error if required fields are missing or any reference does
    /// not resolve.
    pub fn build(self) -> Result<Schema<T>, BuildError> {
        let initial_state = self.initial.ok_or(BuildError::MissingInitialState)?;
        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let schema = Schema {
            states: self.states.into_iter().collect(),
            on: self.on,
            entry: self.entry,
            exit: self.exit,
            effects: self.effects,
            context: self.context,
            computed: self.computed,
            implementations: self.implementations,
            initial_state,
            props: self.props,
            refs: self.refs,
            watch: self.watch,
        };

        let violations = validate::violations(&schema);
        if !violations.is_empty() {
            return Err(BuildError::Invalid {
                count: violations.len(),
                violations,
            });
        }

        Ok(schema)
    }
}

impl<T: MachineTypes> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
