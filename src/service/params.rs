//! The parameter bundle handed to every action, guard, effect and watch
//! function, and the narrower bundle handed to computed functions.

use crate::context::MachineContext;
use crate::core::{Event, MachineTypes};
use crate::refs::Refs;
use crate::schema::Schema;
use crate::scope::Scope;
use crate::service::queue::Task;
use crate::service::track::{DepsFn, TrackFn};
use crate::service::{EventSender, Service};
use std::rc::Rc;

/// Read access to a service's current state.
pub struct StateView<'a, T: MachineTypes> {
    service: &'a Service<T>,
}

impl<'a, T: MachineTypes> StateView<'a, T> {
    pub(crate) fn new(service: &'a Service<T>) -> Self {
        Self { service }
    }

    /// The active state.
    pub fn get(&self) -> T::State {
        self.service.state.get()
    }

    /// The state the service was created in.
    pub fn initial(&self) -> &'a T::State {
        self.service.state.initial()
    }

    /// Whether the active state is any of `states`.
    pub fn matches(&self, states: &[T::State]) -> bool {
        states.contains(&self.get())
    }

    /// Whether the active state's node carries `tag`.
    pub fn has_tag(&self, tag: &T::Tag) -> bool {
        self.service
            .schema
            .state(&self.get())
            .is_some_and(|node| node.has_tag(tag))
    }
}

/// The event being processed and the one before it.
pub struct EventView<'a, T: MachineTypes> {
    service: &'a Service<T>,
}

impl<'a, T: MachineTypes> EventView<'a, T> {
    pub(crate) fn new(service: &'a Service<T>) -> Self {
        Self { service }
    }

    pub fn current(&self) -> Option<T::Event> {
        self.service.events.borrow().current.clone()
    }

    pub fn previous(&self) -> Option<T::Event> {
        self.service.events.borrow().previous.clone()
    }

    /// Kind of the current event.
    pub fn kind(&self) -> Option<<T::Event as Event>::Kind> {
        self.service.events.borrow().current.as_ref().map(Event::kind)
    }
}

/// Parameter bundle for one dispatch cycle.
///
/// Behavior functions receive it by reference and use it to read the
/// service, mutate context and refs, and send further events.
pub struct Params<'a, T: MachineTypes> {
    service: &'a Service<T>,
    props: Rc<T::Props>,
}

impl<'a, T: MachineTypes> Params<'a, T> {
    pub(crate) fn new(service: &'a Service<T>) -> Self {
        Self {
            props: service.props(),
            service,
        }
    }

    pub fn state(&self) -> StateView<'a, T> {
        StateView::new(self.service)
    }

    pub fn context(&self) -> &'a MachineContext<T> {
        &self.service.context
    }

    pub fn event(&self) -> EventView<'a, T> {
        EventView::new(self.service)
    }

    /// Normalized props, as of the start of this cycle.
    pub fn prop(&self) -> &T::Props {
        &self.props
    }

    pub fn refs(&self) -> &'a Refs<T::Refs> {
        &self.service.refs
    }

    pub fn scope(&self) -> &'a Scope {
        &self.service.scope
    }

    /// Enqueue an event; it is processed after the current task.
    pub fn send(&self, event: T::Event) {
        self.service.send(event);
    }

    /// A handle for sending events after this cycle has ended.
    pub fn sender(&self) -> EventSender<T> {
        self.service.sender()
    }

    /// Run `f` after the tasks already queued.
    pub fn flush<F>(&self, f: F)
    where
        F: FnOnce(&Params<'_, T>) + 'static,
    {
        self.service.queue.push(Task::Flush(Box::new(f)));
    }

    /// Run `effect` whenever the values returned by `deps` change.
    ///
    /// Dependencies are compared by hash after every processed task. The
    /// effect does not run at registration; trackers are discarded when the
    /// service stops or restarts. Only honored from the schema's `watch`
    /// hook; anywhere else it logs a warning and does nothing.
    pub fn track<D, F>(&self, deps: D, effect: F)
    where
        D: Fn(&Params<'_, T>) -> Vec<T::Value> + 'static,
        F: Fn(&Params<'_, T>) + 'static,
    {
        if !self.service.trackers.is_collecting() {
            tracing::warn!("track called outside the watch hook, ignored");
            return;
        }
        let deps: DepsFn<T> = Box::new(deps);
        let effect: TrackFn<T> = Box::new(effect);
        self.service.trackers.register(deps, effect, self);
    }

    pub(crate) fn schema(&self) -> &'a Schema<T> {
        &self.service.schema
    }
}

impl<T: MachineTypes> Clone for Params<'_, T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service,
            props: Rc::clone(&self.props),
        }
    }
}

/// Parameter bundle for computed functions.
///
/// Computed values are derived data: they can read the service and other
/// computed values but cannot send events or flush.
pub struct ComputedParams<'a, T: MachineTypes> {
    params: Params<'a, T>,
}

impl<'a, T: MachineTypes> ComputedParams<'a, T> {
    pub(crate) fn new(params: Params<'a, T>) -> Self {
        Self { params }
    }

    pub fn context(&self) -> &'a MachineContext<T> {
        self.params.context()
    }

    pub fn event(&self) -> EventView<'a, T> {
        self.params.event()
    }

    pub fn prop(&self) -> &T::Props {
        self.params.prop()
    }

    pub fn refs(&self) -> &'a Refs<T::Refs> {
        self.params.refs()
    }

    pub fn scope(&self) -> &'a Scope {
        self.params.scope()
    }

    /// Evaluate another computed value.
    ///
    /// # Panics
    ///
    /// Panics if `key` has no computed function.
    pub fn computed(&self, key: &T::Computed) -> T::Value {
        self.params.computed(key)
    }
}
