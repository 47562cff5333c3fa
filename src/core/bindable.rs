//! Reactive value cells.
//!
//! A [`Bindable`] holds one value for a running service: a context field or
//! the current state. Change detection goes through the cell's hash function,
//! so structurally equal values never notify.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Hash function used for change detection.
pub type HashFn<V> = Box<dyn Fn(&V) -> String>;

type ChangeFn<V> = Box<dyn Fn(&V, &V)>;
type Listener<V> = Rc<dyn Fn(&V, &V)>;

/// Handle returned by [`Bindable::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Canonical hash of a serializable value.
///
/// Values that fail to serialize hash to the empty string.
pub fn default_hash<V: Serialize + ?Sized>(value: &V) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// A single reactive value holder.
///
/// # Example
///
/// ```rust
/// use statekit::core::Bindable;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let changes = Rc::new(Cell::new(0));
/// let seen = Rc::clone(&changes);
///
/// let cell = Bindable::new(1).on_change(move |_next, _prev| seen.set(seen.get() + 1));
///
/// cell.set(1); // same hash, no notification
/// cell.set(2);
///
/// assert_eq!(cell.get(), 2);
/// assert_eq!(*cell.initial(), 1);
/// assert_eq!(changes.get(), 1);
/// ```
pub struct Bindable<V> {
    initial: V,
    value: RefCell<V>,
    hash: HashFn<V>,
    on_change: Option<ChangeFn<V>>,
    listeners: RefCell<Vec<(SubscriptionId, Listener<V>)>>,
    next_id: Cell<u64>,
}

impl<V: Clone + Serialize + 'static> Bindable<V> {
    /// Create a cell whose hash is the value's JSON encoding.
    pub fn new(initial: V) -> Self {
        Self::with_hash_fn(initial, Box::new(|value: &V| default_hash(value)))
    }
}

impl<V: Clone + 'static> Bindable<V> {
    fn with_hash_fn(initial: V, hash: HashFn<V>) -> Self {
        Self {
            value: RefCell::new(initial.clone()),
            initial,
            hash,
            on_change: None,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Replace the hash function used for change detection.
    pub fn with_hash<F>(mut self, hash: F) -> Self
    where
        F: Fn(&V) -> String + 'static,
    {
        self.hash = Box::new(hash);
        self
    }

    /// Set the change hook, called with `(next, previous)` before subscribers.
    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&V, &V) + 'static,
    {
        self.on_change = Some(Box::new(hook));
        self
    }

    /// Latest committed value.
    pub fn get(&self) -> V {
        self.value.borrow().clone()
    }

    /// Value the cell was created with.
    pub fn initial(&self) -> &V {
        &self.initial
    }

    /// Hash of an arbitrary value under this cell's hash function.
    pub fn hash(&self, value: &V) -> String {
        (self.hash)(value)
    }

    /// Hash of the current value.
    pub fn current_hash(&self) -> String {
        self.hash(&self.value.borrow())
    }

    /// Store a value, notifying if its hash differs from the previous one.
    pub fn set(&self, next: V) {
        let prev = self.store(next.clone());
        if self.hash(&prev) != self.hash(&next) {
            self.notify(&next, &prev);
        }
    }

    /// Store a value derived from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&V) -> V,
    {
        let next = f(&self.value.borrow());
        self.set(next);
    }

    /// Register a subscriber called with `(next, previous)` on every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&V, &V) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Store without notifying, returning the previous value.
    pub(crate) fn store(&self, next: V) -> V {
        self.value.replace(next)
    }

    /// Run the change hook and subscribers.
    ///
    /// Subscribers are snapshotted first so they may subscribe, unsubscribe
    /// or set this cell again.
    pub(crate) fn notify(&self, next: &V, prev: &V) {
        if let Some(hook) = &self.on_change {
            hook(next, prev);
        }
        let listeners: Vec<Listener<V>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(next, prev);
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Bindable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindable")
            .field("value", &self.value.borrow())
            .field("initial", &self.initial)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
