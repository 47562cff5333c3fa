//! Running machine instances.
//!
//! A [`Service`] instantiates a [`Schema`] for one component: it owns the
//! context, refs, effect registry and event queue, resolves events into
//! transitions and runs actions and effects in a fixed order.
//!
//! Services are single-threaded. Events are never processed inline; the
//! owner drains the queue with [`Service::run_pending`], typically from the
//! wake-up scheduled by [`ServiceOptions::on_schedule`].

mod dispatch;
mod effects;
mod error;
mod params;
mod queue;
mod track;

pub use effects::Cleanup;
pub use error::MachineError;
pub use params::{ComputedParams, EventView, Params, StateView};
pub use queue::EventSender;

use crate::context::MachineContext;
use crate::core::{Bindable, Event, MachineTypes, State, StateHistory, StateTransition};
use crate::core::{kind_label, SubscriptionId, DEFAULT_HISTORY_LIMIT};
use crate::refs::Refs;
use crate::schema::{Effects, Schema, StateNode, Transition};
use crate::scope::Scope;
use crate::snapshot::Snapshot;
use chrono::Utc;
use effects::{EffectRegistry, EffectSlot};
use queue::{EventQueue, Task};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use track::Trackers;

/// Lifecycle status of a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    NotStarted,
    Started,
    Stopped,
}

/// Options for [`Service::with_options`].
pub struct ServiceOptions<T: MachineTypes> {
    props: T::Props,
    scope: Option<Scope>,
    resume: Option<Snapshot<T::State>>,
    history_limit: usize,
    on_schedule: Option<Box<dyn Fn()>>,
}

impl<T: MachineTypes> ServiceOptions<T> {
    pub fn new(props: T::Props) -> Self {
        Self {
            props,
            scope: None,
            resume: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            on_schedule: None,
        }
    }

    /// Scope handed to behavior functions. Defaults to a generated id.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Start from the state captured by a previous service.
    pub fn resume(mut self, snapshot: Snapshot<T::State>) -> Self {
        self.resume = Some(snapshot);
        self
    }

    /// Maximum number of transitions kept in the history journal.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Called whenever a task is queued while the queue was empty, so a host
    /// can schedule a call to [`Service::run_pending`].
    pub fn on_schedule<F>(mut self, hook: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_schedule = Some(Box::new(hook));
        self
    }
}

#[derive(Debug)]
struct EventRecord<E> {
    current: Option<E>,
    previous: Option<E>,
}

/// Resets the draining flag even if a task panics.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A live instance of a schema.
///
/// # Example
///
/// ```rust
/// use statekit::core::{Event, MachineTypes};
/// use statekit::schema::{Schema, StateNode, Transition};
/// use statekit::service::Service;
/// use statekit::state_enum;
/// use std::sync::Arc;
///
/// state_enum! {
///     pub enum Toggle {
///         Off => "off",
///         On => "on",
///     }
/// }
///
/// #[derive(Clone, Debug)]
/// pub struct Flip;
///
/// impl Event for Flip {
///     type Kind = &'static str;
///     fn kind(&self) -> &'static str {
///         "FLIP"
///     }
/// }
///
/// pub struct Switch;
///
/// impl MachineTypes for Switch {
///     type State = Toggle;
///     type Event = Flip;
///     type Props = ();
///     type Context = &'static str;
///     type Value = serde_json::Value;
///     type Computed = &'static str;
///     type Action = &'static str;
///     type Guard = &'static str;
///     type Effect = &'static str;
///     type Tag = &'static str;
///     type Refs = ();
/// }
///
/// let schema = Schema::<Switch>::builder()
///     .initial(Toggle::Off)
///     .state(Toggle::Off, StateNode::new().on("FLIP", Transition::to(Toggle::On)))
///     .state(Toggle::On, StateNode::new().on("FLIP", Transition::to(Toggle::Off)))
///     .build()
///     .unwrap();
///
/// let service = Service::new(Arc::new(schema), ()).unwrap();
/// service.start();
///
/// service.send(Flip);
/// assert_eq!(service.state().get(), Toggle::Off);
///
/// service.run_pending();
/// assert_eq!(service.state().get(), Toggle::On);
/// ```
pub struct Service<T: MachineTypes> {
    schema: Arc<Schema<T>>,
    scope: Scope,
    props: RefCell<Rc<T::Props>>,
    context: MachineContext<T>,
    refs: Refs<T::Refs>,
    state: Bindable<T::State>,
    events: RefCell<EventRecord<T::Event>>,
    effects: RefCell<EffectRegistry<T::State>>,
    pending: RefCell<Option<Transition<T>>>,
    status: Cell<MachineStatus>,
    hydrated: RefCell<Option<T::State>>,
    queue: Rc<EventQueue<T>>,
    trackers: Trackers<T>,
    history: RefCell<StateHistory<T::State>>,
    draining: Cell<bool>,
}

impl<T: MachineTypes> Service<T> {
    /// Create a service with default options.
    pub fn new(schema: Arc<Schema<T>>, props: T::Props) -> Result<Self, MachineError> {
        Self::with_options(schema, ServiceOptions::new(props))
    }

    /// Create a service.
    ///
    /// Props are normalized, then the context and refs are created from
    /// them. Fails if the initial (or resumed) state is not declared, or the
    /// snapshot was written by an unsupported version.
    pub fn with_options(
        schema: Arc<Schema<T>>,
        options: ServiceOptions<T>,
    ) -> Result<Self, MachineError> {
        let scope = options.scope.unwrap_or_default();
        let props = schema.normalize_props(options.props, &scope);

        let initial = match options.resume {
            Some(snapshot) => {
                snapshot.check_version()?;
                tracing::debug!(
                    snapshot = %snapshot.id,
                    state = snapshot.state.name(),
                    "resuming from snapshot"
                );
                snapshot.state
            }
            None => schema.initial_state(&props),
        };
        if !schema.is_declared(&initial) {
            return Err(MachineError::UndeclaredState {
                state: initial.name().to_string(),
            });
        }

        let context = schema.create_context(&props, &scope);
        let refs = Refs::new(schema.create_refs(&props, &context));

        Ok(Self {
            scope,
            props: RefCell::new(Rc::new(props)),
            context,
            refs,
            state: Bindable::new(initial),
            events: RefCell::new(EventRecord {
                current: None,
                previous: None,
            }),
            effects: RefCell::new(EffectRegistry::new()),
            pending: RefCell::new(None),
            status: Cell::new(MachineStatus::NotStarted),
            hydrated: RefCell::new(None),
            queue: Rc::new(EventQueue::new(options.on_schedule)),
            trackers: Trackers::new(),
            history: RefCell::new(StateHistory::with_limit(options.history_limit)),
            draining: Cell::new(false),
            schema,
        })
    }

    /// Activate the service.
    ///
    /// A fresh activation enters the root (entry actions and root effects)
    /// and then the initial state. Starting a service that is already
    /// started rehydrates instead: the active state's effects are torn down
    /// and the state is re-entered without replaying root setup.
    pub fn start(&self) {
        let started = self.status.get() == MachineStatus::Started;
        self.status.set(MachineStatus::Started);

        let (initial, prev) = if started {
            let current = self.state.get();
            tracing::debug!(state = current.name(), "rehydrating");
            (current.clone(), Some(current))
        } else {
            let hydrated = self.hydrated.borrow().clone();
            let initial = hydrated.unwrap_or_else(|| self.state.initial().clone());
            tracing::debug!(state = initial.name(), "initializing");
            (initial, None)
        };

        self.state.store(initial.clone());
        self.observe(&initial, prev.as_ref());
        self.record(prev, initial, None);

        self.trackers.clear();
        if let Some(watch) = self.schema.watch() {
            self.trackers.collect(|| watch(&self.params()));
        }
    }

    /// Deactivate the service.
    ///
    /// Runs every registered cleanup in registration order, drops queued
    /// tasks and trackers, then runs root exit actions. Does nothing unless
    /// the service is started.
    pub fn stop(&self) {
        if self.status.get() != MachineStatus::Started {
            return;
        }
        let current = self.state.get();
        tracing::debug!(state = current.name(), "unmounting");

        *self.hydrated.borrow_mut() = Some(current);
        self.status.set(MachineStatus::Stopped);

        let cleanups = self.effects.borrow_mut().drain();
        for cleanup in cleanups {
            cleanup.run();
        }
        self.pending.borrow_mut().take();
        let dropped = self.queue.clear();
        if dropped > 0 {
            tracing::trace!(dropped, "discarded queued tasks");
        }
        self.trackers.clear();

        if let Some(exit) = self.schema.exit() {
            self.params().action(exit);
        }
    }

    /// Queue an event. It is processed by the next [`Service::run_pending`].
    pub fn send(&self, event: T::Event) {
        self.queue.push(Task::Event(event));
    }

    /// A handle for sending events from outside a dispatch cycle.
    pub fn sender(&self) -> EventSender<T> {
        EventSender::new(&self.queue)
    }

    /// Process queued tasks until the queue is empty, including tasks queued
    /// while processing. Returns how many tasks were processed.
    ///
    /// A call made while the queue is already being drained returns `0`
    /// immediately; the outer call picks up anything queued meanwhile.
    pub fn run_pending(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _guard = DrainGuard(&self.draining);

        let mut processed = 0;
        while let Some(task) = self.queue.pop() {
            match task {
                Task::Event(event) => self.dispatch(event),
                Task::Flush(f) => {
                    if self.status.get() == MachineStatus::Started {
                        f(&self.params());
                    }
                }
            }
            processed += 1;

            if self.status.get() == MachineStatus::Started {
                self.trackers.run(&self.params());
            }
        }
        processed
    }

    /// Whether tasks are waiting for [`Service::run_pending`].
    pub fn has_pending(&self) -> bool {
        self.queue.len() > 0
    }

    pub fn state(&self) -> StateView<'_, T> {
        StateView::new(self)
    }

    pub fn context(&self) -> &MachineContext<T> {
        &self.context
    }

    pub fn event(&self) -> EventView<'_, T> {
        EventView::new(self)
    }

    /// Evaluate a computed value.
    ///
    /// # Panics
    ///
    /// Panics if the schema has no computed function for `key`.
    pub fn computed(&self, key: &T::Computed) -> T::Value {
        self.params().computed(key)
    }

    pub fn try_computed(&self, key: &T::Computed) -> Result<T::Value, MachineError> {
        self.params().try_computed(key)
    }

    pub fn refs(&self) -> &Refs<T::Refs> {
        &self.refs
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current normalized props.
    pub fn props(&self) -> Rc<T::Props> {
        Rc::clone(&self.props.borrow())
    }

    /// Replace the props. They are normalized like the initial props; the
    /// context and refs are not recreated.
    pub fn set_props(&self, props: T::Props) {
        let props = self.schema.normalize_props(props, &self.scope);
        *self.props.borrow_mut() = Rc::new(props);
    }

    pub fn status(&self) -> MachineStatus {
        self.status.get()
    }

    /// Subscribe to committed state changes, called with `(next, previous)`
    /// after the new state has been entered.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T::State, &T::State) + 'static,
    {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    /// Capture the active state so a new service can resume from it.
    pub fn snapshot(&self) -> Snapshot<T::State> {
        Snapshot::new(self.scope.id(), self.state.get(), self.status.get())
    }

    /// Journal of committed state changes.
    pub fn history(&self) -> StateHistory<T::State> {
        self.history.borrow().clone()
    }

    pub fn schema(&self) -> &Arc<Schema<T>> {
        &self.schema
    }

    pub(crate) fn params(&self) -> Params<'_, T> {
        Params::new(self)
    }

    fn dispatch(&self, event: T::Event) {
        if self.status.get() != MachineStatus::Started {
            tracing::trace!(?event, status = ?self.status.get(), "event dropped");
            return;
        }

        let kind = event.kind();
        {
            let mut events = self.events.borrow_mut();
            let previous = events.current.replace(event);
            events.previous = previous;
        }

        let current = self.state.get();
        let params = self.params();
        let Some(transition) = params
            .choose(self.schema.transitions_for(&current, &kind))
            .cloned()
        else {
            tracing::trace!(state = current.name(), event = ?kind, "no transition");
            return;
        };

        let target = transition
            .target()
            .cloned()
            .unwrap_or_else(|| current.clone());

        if target == current {
            params.action(transition.actions());
            return;
        }

        *self.pending.borrow_mut() = Some(transition);
        tracing::debug!(
            from = current.name(),
            to = target.name(),
            event = ?kind,
            "transition"
        );

        let prev = self.state.store(target.clone());
        self.observe(&target, Some(&prev));
        self.state.notify(&target, &prev);
        self.record(Some(prev), target, Some(kind_label(&kind)));
    }

    /// Leave `prev` (if any) and enter `next`.
    ///
    /// Order: exit cleanup, exit actions, transition actions, state effects,
    /// root entry and root effects on a fresh activation, entry actions.
    fn observe(&self, next: &T::State, prev: Option<&T::State>) {
        let params = self.params();

        if let Some(prev) = prev {
            let cleanup = self
                .effects
                .borrow_mut()
                .remove(&EffectSlot::State(prev.clone()));
            if let Some(cleanup) = cleanup {
                cleanup.run();
            }
            if let Some(exit) = self.schema.state(prev).and_then(StateNode::exit_actions) {
                params.action(exit);
            }
        }

        let transition = self.pending.borrow_mut().take();
        if let Some(transition) = transition {
            params.action(transition.actions());
        }

        let node = self.schema.state(next);
        if let Some(effects) = node.and_then(StateNode::state_effects) {
            self.run_effects(EffectSlot::State(next.clone()), effects, &params);
        }

        if prev.is_none() {
            if let Some(entry) = self.schema.entry() {
                params.action(entry);
            }
            if let Some(effects) = self.schema.effects() {
                self.run_effects(EffectSlot::Root, effects, &params);
            }
        }

        if let Some(entry) = node.and_then(StateNode::entry_actions) {
            params.action(entry);
        }
    }

    /// Run `effects` and register their cleanup under `slot`.
    ///
    /// The slot is always vacant here: leaving a state removes its slot, and
    /// the root slot is only filled on a fresh activation after `stop` has
    /// drained the registry.
    fn run_effects(&self, slot: EffectSlot<T::State>, effects: &Effects<T>, params: &Params<'_, T>) {
        let Some(cleanup) = params.effect(effects) else {
            return;
        };
        let displaced = self.effects.borrow_mut().insert(slot, cleanup);
        debug_assert!(displaced.is_none(), "effect slot was still occupied");
    }

    fn record(&self, from: Option<T::State>, to: T::State, event: Option<String>) {
        self.history.borrow_mut().record(StateTransition {
            from,
            to,
            event,
            timestamp: Utc::now(),
        });
    }
}

impl<T: MachineTypes> fmt::Debug for Service<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("scope", &self.scope.id())
            .field("state", &self.state.get())
            .field("status", &self.status.get())
            .field("effects", &self.effects.borrow().len())
            .field("queued", &self.queue.len())
            .field("trackers", &self.trackers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::snapshot::SNAPSHOT_VERSION;
    use crate::testing::{
        fixture_builder, fixture_schema, fixture_service, CallLog, Fixture, FixtureEvent,
        FixtureState,
    };
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn disclosure(log: &CallLog) -> impl FnOnce(SchemaBuilder<Fixture>) -> SchemaBuilder<Fixture> {
        let log = log.clone();
        move |builder| {
            builder
                .entry(["rootEntry"])
                .exit(["rootExit"])
                .effects(["rootEffect"])
                .state(
                    FixtureState::Idle,
                    StateNode::new()
                        .on("OPEN", Transition::to(FixtureState::Open).with_actions(["onOpen"]))
                        .entry(["enterIdle"])
                        .exit(["exitIdle"])
                        .effects(["idleEffect"]),
                )
                .state(
                    FixtureState::Open,
                    StateNode::new()
                        .on("CLOSE", Transition::to(FixtureState::Idle))
                        .on("OPEN", Transition::to(FixtureState::Open).with_actions(["reopen"]))
                        .on("PING", Transition::internal().with_actions(["ping"]))
                        .entry(["enterOpen"])
                        .exit(["exitOpen"])
                        .effects(["openEffect"]),
                )
                .action("rootEntry", log.action("root entry"))
                .action("rootExit", log.action("root exit"))
                .action("enterIdle", log.action("enter idle"))
                .action("exitIdle", log.action("exit idle"))
                .action("enterOpen", log.action("enter open"))
                .action("exitOpen", log.action("exit open"))
                .action("onOpen", log.action("on open"))
                .action("reopen", log.action("reopen"))
                .action("ping", log.action("ping"))
                .effect("rootEffect", log.effect("root effect"))
                .effect("idleEffect", log.effect("idle effect"))
                .effect("openEffect", log.effect("open effect"))
        }
    }

    #[test]
    fn new_rejects_undeclared_initial_state() {
        let schema = Schema::<Fixture>::builder()
            .initial(FixtureState::Closing)
            .state(FixtureState::Idle, StateNode::new())
            .build()
            .unwrap();

        let result = Service::<Fixture>::new(Arc::new(schema), Value::Null);
        assert_eq!(
            result.err(),
            Some(MachineError::UndeclaredState {
                state: "closing".to_string()
            })
        );
    }

    #[test]
    fn start_enters_root_then_initial_state() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        assert_eq!(service.status(), MachineStatus::NotStarted);

        service.start();

        assert_eq!(service.status(), MachineStatus::Started);
        assert_eq!(
            log.entries(),
            vec!["idle effect start", "root entry", "root effect start", "enter idle"]
        );
    }

    #[test]
    fn transition_exits_before_entering() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        log.take();

        service.send(FixtureEvent("OPEN"));
        service.run_pending();

        assert_eq!(service.state().get(), FixtureState::Open);
        assert_eq!(
            log.entries(),
            vec![
                "idle effect cleanup",
                "exit idle",
                "on open",
                "open effect start",
                "enter open"
            ]
        );
    }

    #[test]
    fn self_transition_runs_only_actions() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();
        log.take();

        service.send(FixtureEvent("OPEN"));
        service.send(FixtureEvent("PING"));
        service.run_pending();

        assert_eq!(service.state().get(), FixtureState::Open);
        assert_eq!(log.entries(), vec!["reopen", "ping"]);
    }

    #[test]
    fn unmatched_events_are_ignored() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        log.take();

        service.send(FixtureEvent("CLOSE"));
        assert_eq!(service.run_pending(), 1);

        assert_eq!(service.state().get(), FixtureState::Idle);
        assert!(log.entries().is_empty());
        assert_eq!(service.event().current(), Some(FixtureEvent("CLOSE")));
    }

    #[test]
    fn machine_table_applies_only_when_state_lacks_the_kind() {
        let service = fixture_service(|builder| {
            builder
                .state(
                    FixtureState::Idle,
                    StateNode::new()
                        .on("OPEN", Transition::to(FixtureState::Open).with_guard("never")),
                )
                .on("OPEN", Transition::to(FixtureState::Closing))
                .on("RESET", Transition::to(FixtureState::Closing))
        });
        service.start();

        service.send(FixtureEvent("OPEN"));
        service.run_pending();
        assert_eq!(service.state().get(), FixtureState::Idle);

        service.send(FixtureEvent("RESET"));
        service.run_pending();
        assert_eq!(service.state().get(), FixtureState::Closing);
    }

    #[test]
    fn events_before_start_are_dropped() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));

        service.send(FixtureEvent("OPEN"));
        assert_eq!(service.run_pending(), 1);
        assert!(log.entries().is_empty());
        assert!(service.event().current().is_none());

        service.start();
        assert_eq!(service.state().get(), FixtureState::Idle);
    }

    #[test]
    fn stop_drains_effects_then_runs_root_exit() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();
        log.take();

        service.stop();

        assert_eq!(service.status(), MachineStatus::Stopped);
        assert_eq!(
            log.take(),
            vec!["root effect cleanup", "open effect cleanup", "root exit"]
        );

        service.send(FixtureEvent("CLOSE"));
        service.run_pending();
        service.stop();
        assert!(log.entries().is_empty());
        assert_eq!(service.state().get(), FixtureState::Open);
    }

    #[test]
    fn stop_discards_queued_events() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        service.send(FixtureEvent("OPEN"));
        assert!(service.has_pending());

        service.stop();
        assert!(!service.has_pending());
        assert_eq!(service.state().get(), FixtureState::Idle);
    }

    #[test]
    fn restart_while_started_rehydrates_without_root_entry() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        log.take();

        service.start();

        assert_eq!(
            log.entries(),
            vec![
                "idle effect cleanup",
                "exit idle",
                "idle effect start",
                "enter idle"
            ]
        );
    }

    #[test]
    fn restart_while_started_keeps_the_active_state() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();
        log.take();

        service.start();

        assert_eq!(service.state().get(), FixtureState::Open);
        assert_eq!(
            log.entries(),
            vec![
                "open effect cleanup",
                "exit open",
                "open effect start",
                "enter open"
            ]
        );
        assert_eq!(service.effects.borrow().len(), 2);

        log.take();
        service.stop();
        assert_eq!(
            log.entries(),
            vec!["root effect cleanup", "open effect cleanup", "root exit"]
        );
    }

    #[test]
    fn start_after_stop_resumes_hydrated_state() {
        let log = CallLog::new();
        let service = fixture_service(disclosure(&log));
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();
        service.stop();
        log.take();

        service.start();

        assert_eq!(service.state().get(), FixtureState::Open);
        assert_eq!(
            log.entries(),
            vec!["open effect start", "root entry", "root effect start", "enter open"]
        );
    }

    #[test]
    fn events_sent_while_processing_run_afterwards() {
        let log = CallLog::new();
        let service = fixture_service(|builder| {
            disclosure(&log)(builder).action("onOpen", |p| p.send(FixtureEvent("CLOSE")))
        });
        service.start();

        service.send(FixtureEvent("OPEN"));
        assert_eq!(service.run_pending(), 2);

        assert_eq!(service.state().get(), FixtureState::Idle);
        assert_eq!(
            service.history().get_path(),
            vec![&FixtureState::Idle, &FixtureState::Open, &FixtureState::Idle]
        );
    }

    #[test]
    fn nested_run_pending_is_a_no_op() {
        let service = Rc::new(fixture_service(|builder| {
            builder.state(
                FixtureState::Idle,
                StateNode::new().on("OPEN", Transition::to(FixtureState::Open)),
            )
        }));
        let nested = Rc::new(Cell::new(None));

        let weak = Rc::downgrade(&service);
        let seen = Rc::clone(&nested);
        service.subscribe(move |_, _| {
            if let Some(service) = weak.upgrade() {
                seen.set(Some(service.run_pending()));
            }
        });

        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();

        assert_eq!(nested.get(), Some(0));
        assert_eq!(service.state().get(), FixtureState::Open);
    }

    #[test]
    fn subscribers_see_the_committed_state() {
        let service = Rc::new(fixture_service(|builder| {
            builder.state(
                FixtureState::Idle,
                StateNode::new().on("OPEN", Transition::to(FixtureState::Open)),
            )
        }));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let id = service.subscribe(move |next, prev| sink.borrow_mut().push((*prev, *next)));
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();

        assert_eq!(
            *seen.borrow(),
            vec![(FixtureState::Idle, FixtureState::Open)]
        );
        assert!(service.unsubscribe(id));
    }

    #[test]
    fn flush_runs_in_queue_order() {
        let log = CallLog::new();
        let flushed = log.clone();
        let service = fixture_service(|builder| {
            builder
                .state(
                    FixtureState::Idle,
                    StateNode::new().on("OPEN", Transition::to(FixtureState::Open)),
                )
                .action("flushLater", move |p| {
                    let log = flushed.clone();
                    p.flush(move |p| log.push(format!("flushed in {:?}", p.state().get())));
                })
                .entry(["flushLater"])
        });

        service.start();
        service.send(FixtureEvent("OPEN"));
        assert_eq!(service.run_pending(), 2);
        assert_eq!(log.entries(), vec!["flushed in Idle"]);
        assert_eq!(service.state().get(), FixtureState::Open);
    }

    #[test]
    fn watch_trackers_fire_on_change_only() {
        let log = CallLog::new();
        let tracked = log.clone();
        let service = fixture_service(|builder| {
            builder
                .state(
                    FixtureState::Idle,
                    StateNode::new()
                        .on("BUMP", Transition::internal().with_actions(["record"]))
                        .on("NOOP", Transition::internal()),
                )
                .watch(move |p| {
                    let log = tracked.clone();
                    p.track(
                        |p| vec![p.context().get(&"count").unwrap_or_default()],
                        move |p| log.push(format!("count {}", p.context().get(&"count").unwrap_or_default())),
                    );
                })
        });

        service.start();
        for kind in ["NOOP", "BUMP", "NOOP", "BUMP"] {
            service.send(FixtureEvent(kind));
        }
        service.run_pending();

        assert_eq!(log.entries(), vec!["count 1", "count 2"]);
    }

    #[test]
    fn restart_replaces_trackers() {
        let registrations = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&registrations);
        let service = fixture_service(|builder| {
            builder.watch(move |p| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                p.track(|_| Vec::new(), |_| {});
            })
        });

        service.start();
        service.start();
        assert_eq!(service.trackers.len(), 1);
        assert_eq!(registrations.load(std::sync::atomic::Ordering::SeqCst), 2);

        service.stop();
        assert_eq!(service.trackers.len(), 0);
    }

    #[test]
    fn track_outside_watch_is_ignored() {
        let service = fixture_service(|builder| {
            builder
                .state(
                    FixtureState::Idle,
                    StateNode::new().on("PING", Transition::internal().with_actions(["retrack"])),
                )
                .action("retrack", |p| p.track(|_| Vec::new(), |_| {}))
                .watch(|p| p.track(|_| Vec::new(), |_| {}))
        });

        service.start();
        for _ in 0..100 {
            service.send(FixtureEvent("PING"));
        }
        service.run_pending();

        assert_eq!(service.trackers.len(), 1);
    }

    #[test]
    fn sender_outlives_the_dispatch_cycle() {
        let service = fixture_service(|builder| {
            builder.state(
                FixtureState::Idle,
                StateNode::new().on("OPEN", Transition::to(FixtureState::Open)),
            )
        });
        service.start();

        let sender = service.sender();
        assert!(sender.send(FixtureEvent("OPEN")));
        service.run_pending();
        assert_eq!(service.state().get(), FixtureState::Open);

        drop(service);
        assert!(!sender.send(FixtureEvent("CLOSE")));
    }

    #[test]
    fn schedule_hook_wakes_the_host() {
        let wakes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&wakes);
        let schema = Arc::new(fixture_schema(|builder| builder));
        let options = ServiceOptions::new(Value::Null)
            .on_schedule(move || counter.set(counter.get() + 1));
        let service = Service::<Fixture>::with_options(schema, options).unwrap();

        service.send(FixtureEvent("A"));
        service.send(FixtureEvent("B"));
        assert_eq!(wakes.get(), 1);

        service.run_pending();
        service.send(FixtureEvent("C"));
        assert_eq!(wakes.get(), 2);
    }

    #[test]
    fn props_are_normalized() {
        let schema = Arc::new(fixture_schema(|builder| {
            builder
                .props(|props, scope| json!({ "id": scope.id(), "loop": props["loop"].as_bool().unwrap_or(false) }))
                .initial_fn(|props| {
                    if props["loop"] == json!(true) {
                        FixtureState::Open
                    } else {
                        FixtureState::Idle
                    }
                })
        }));
        let options = ServiceOptions::new(json!({ "loop": true })).scope(Scope::new("carousel"));
        let service = Service::with_options(schema, options).unwrap();

        assert_eq!(*service.props(), json!({ "id": "carousel", "loop": true }));
        assert_eq!(service.state().get(), FixtureState::Open);

        service.set_props(json!({}));
        assert_eq!(*service.props(), json!({ "id": "carousel", "loop": false }));
    }

    #[test]
    fn refs_come_from_the_factory() {
        let service = fixture_service(|builder| {
            builder
                .refs(|_, context| vec![format!("count={}", context.get(&"count").unwrap_or_default())])
                .action("remember", |p| p.refs().with_mut(|refs| refs.push("entered".into())))
                .entry(["remember"])
        });
        service.start();

        assert_eq!(*service.refs().get(), vec!["count=0", "entered"]);
    }

    #[test]
    fn snapshot_resumes_a_new_service() {
        let service = fixture_service(|builder| {
            builder.state(
                FixtureState::Idle,
                StateNode::new().on("OPEN", Transition::to(FixtureState::Open)),
            )
        });
        service.start();
        service.send(FixtureEvent("OPEN"));
        service.run_pending();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.service_id, service.scope().id());

        let resumed = Service::with_options(
            Arc::clone(service.schema()),
            ServiceOptions::new(Value::Null).resume(snapshot.clone()),
        )
        .unwrap();
        resumed.start();
        assert_eq!(resumed.state().get(), FixtureState::Open);

        let mut stale = snapshot;
        stale.version = SNAPSHOT_VERSION + 1;
        let result = Service::with_options(
            Arc::clone(service.schema()),
            ServiceOptions::new(Value::Null).resume(stale),
        );
        assert!(matches!(
            result.err(),
            Some(MachineError::UnsupportedSnapshot { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn history_is_bounded() {
        let schema = Arc::new(
            fixture_builder()
                .state(
                    FixtureState::Idle,
                    StateNode::new().on("TOGGLE", Transition::to(FixtureState::Open)),
                )
                .state(
                    FixtureState::Open,
                    StateNode::new().on("TOGGLE", Transition::to(FixtureState::Idle)),
                )
                .build()
                .unwrap(),
        );
        let service = Service::with_options(schema, ServiceOptions::new(Value::Null).history_limit(3))
            .unwrap();
        service.start();
        for _ in 0..5 {
            service.send(FixtureEvent("TOGGLE"));
        }
        service.run_pending();

        let history = service.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().to, FixtureState::Open);
        assert_eq!(history.last().unwrap().event.as_deref(), Some("TOGGLE"));
    }
}
