//! Guard predicates for controlling transitions.
//!
//! Guards decide whether a transition candidate is eligible. They are either
//! symbolic names resolved through the schema's implementations map, inline
//! predicates, or boolean compositions of other guards. Guards are expected
//! to be free of side effects; the engine does not enforce it.

use super::types::MachineTypes;
use crate::service::Params;
use std::fmt;
use std::sync::Arc;

/// Inline guard predicate.
pub type GuardFn<T> = Arc<dyn Fn(&Params<'_, T>) -> bool + Send + Sync>;

/// A predicate gating a transition.
pub enum Guard<T: MachineTypes> {
    /// Resolved through `implementations.guards`.
    Named(T::Guard),
    /// Invoked directly.
    Inline(GuardFn<T>),
    /// Negation.
    Not(Box<Guard<T>>),
    /// True when every child is true (short-circuits).
    And(Vec<Guard<T>>),
    /// True when any child is true (short-circuits).
    Or(Vec<Guard<T>>),
}

impl<T: MachineTypes> Guard<T> {
    /// Guard resolved by name at dispatch time.
    pub fn named(name: T::Guard) -> Self {
        Guard::Named(name)
    }

    /// Create a guard from an inline predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> bool + Send + Sync + 'static,
    {
        Guard::Inline(Arc::new(predicate))
    }

    /// Negate a guard.
    #[allow(clippy::should_implement_trait)]
    pub fn not(guard: Guard<T>) -> Self {
        Guard::Not(Box::new(guard))
    }

    /// Conjunction of guards. An empty conjunction is true.
    pub fn and(guards: impl IntoIterator<Item = Guard<T>>) -> Self {
        Guard::And(guards.into_iter().collect())
    }

    /// Disjunction of guards. An empty disjunction is false.
    pub fn or(guards: impl IntoIterator<Item = Guard<T>>) -> Self {
        Guard::Or(guards.into_iter().collect())
    }

    /// Evaluate the guard against a parameter bundle.
    ///
    /// A name without an implementation logs a warning and evaluates to
    /// `false`.
    pub fn check(&self, params: &Params<'_, T>) -> bool {
        match self {
            Guard::Named(name) => match params.schema().implementations().guard(name) {
                Some(predicate) => predicate(params),
                None => {
                    tracing::warn!(guard = ?name, "no implementation found for guard");
                    false
                }
            },
            Guard::Inline(predicate) => predicate(params),
            Guard::Not(inner) => !inner.check(params),
            Guard::And(guards) => guards.iter().all(|guard| guard.check(params)),
            Guard::Or(guards) => guards.iter().any(|guard| guard.check(params)),
        }
    }

    /// Every symbolic name referenced by this guard, depth first.
    pub fn names(&self) -> Vec<&T::Guard> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'g>(&'g self, names: &mut Vec<&'g T::Guard>) {
        match self {
            Guard::Named(name) => names.push(name),
            Guard::Inline(_) => {}
            Guard::Not(inner) => inner.collect_names(names),
            Guard::And(guards) | Guard::Or(guards) => {
                for guard in guards {
                    guard.collect_names(names);
                }
            }
        }
    }
}

impl<T: MachineTypes> Clone for Guard<T> {
    fn clone(&self) -> Self {
        match self {
            Guard::Named(name) => Guard::Named(name.clone()),
            Guard::Inline(predicate) => Guard::Inline(Arc::clone(predicate)),
            Guard::Not(inner) => Guard::Not(inner.clone()),
            Guard::And(guards) => Guard::And(guards.clone()),
            Guard::Or(guards) => Guard::Or(guards.clone()),
        }
    }
}

impl<T: MachineTypes> fmt::Debug for Guard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Guard::Inline(_) => f.write_str("Inline(..)"),
            Guard::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Guard::And(guards) => f.debug_tuple("And").field(guards).finish(),
            Guard::Or(guards) => f.debug_tuple("Or").field(guards).finish(),
        }
    }
}
