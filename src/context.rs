//! Reactive machine context.
//!
//! The context maps each declared key to one [`Bindable`] cell. The key set
//! is fixed when the schema's context factory runs; setting a key that was
//! never declared is a logged no-op.

use crate::core::{Bindable, Key, MachineTypes, SubscriptionId};
use std::collections::HashMap;
use std::fmt;

/// Context type of a machine.
pub type MachineContext<T> = Context<<T as MachineTypes>::Context, <T as MachineTypes>::Value>;

/// Declared fields returned by a schema's context factory.
pub type ContextFields<T> = Vec<(
    <T as MachineTypes>::Context,
    Bindable<<T as MachineTypes>::Value>,
)>;

/// Mapping from context key to bindable cell.
pub struct Context<K, V> {
    cells: HashMap<K, Bindable<V>>,
}

impl<K: Key, V: Clone + 'static> Context<K, V> {
    /// Build a context from declared fields. A key declared twice keeps the
    /// later cell.
    pub fn new(fields: impl IntoIterator<Item = (K, Bindable<V>)>) -> Self {
        let mut cells = HashMap::new();
        for (key, cell) in fields {
            if cells.insert(key.clone(), cell).is_some() {
                tracing::warn!(key = ?key, "context key declared more than once");
            }
        }
        Self { cells }
    }

    /// An empty context.
    pub fn empty() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Current value of a field.
    pub fn get(&self, key: &K) -> Option<V> {
        self.cells.get(key).map(Bindable::get)
    }

    /// Store a value. Unknown keys log a warning and are ignored.
    pub fn set(&self, key: &K, value: V) {
        match self.cells.get(key) {
            Some(cell) => cell.set(value),
            None => tracing::warn!(key = ?key, "set on undeclared context key"),
        }
    }

    /// Store a value derived from the current one.
    pub fn update<F>(&self, key: &K, f: F)
    where
        F: FnOnce(&V) -> V,
    {
        match self.cells.get(key) {
            Some(cell) => cell.update(f),
            None => tracing::warn!(key = ?key, "update on undeclared context key"),
        }
    }

    /// Declared default of a field.
    pub fn initial(&self, key: &K) -> Option<&V> {
        self.cells.get(key).map(Bindable::initial)
    }

    /// Hash of a field's current value.
    pub fn hash(&self, key: &K) -> Option<String> {
        self.cells.get(key).map(Bindable::current_hash)
    }

    /// The cell backing a field.
    pub fn cell(&self, key: &K) -> Option<&Bindable<V>> {
        self.cells.get(key)
    }

    /// Subscribe to changes of one field.
    pub fn subscribe<F>(&self, key: &K, listener: F) -> Option<SubscriptionId>
    where
        F: Fn(&V, &V) + 'static,
    {
        self.cells.get(key).map(|cell| cell.subscribe(listener))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cells.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.cells.keys()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Context<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.cells.iter()).finish()
    }
}
