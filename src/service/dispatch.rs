//! Resolution of symbolic action, guard and effect names.
//!
//! Names that do not resolve are logged and skipped rather than failing the
//! dispatch cycle. Literal names are checked when the schema is built, so
//! these warnings only fire for names produced by functions.

use crate::core::{Guard, MachineTypes};
use crate::schema::{Actions, Effects, Transition};
use crate::service::{Cleanup, ComputedParams, MachineError, Params};

impl<T: MachineTypes> Params<'_, T> {
    /// Run actions in list order.
    ///
    /// Every name is resolved before any action runs.
    pub fn action(&self, actions: &Actions<T>) {
        let implementations = self.schema().implementations();
        let resolved: Vec<_> = actions
            .resolve(self)
            .into_iter()
            .filter_map(|name| {
                let action = implementations.action(&name);
                if action.is_none() {
                    tracing::warn!(action = ?name, "no implementation found for action");
                }
                action
            })
            .collect();

        for action in resolved {
            action(self);
        }
    }

    /// Evaluate a guard.
    pub fn guard(&self, guard: &Guard<T>) -> bool {
        guard.check(self)
    }

    /// Run effects in list order, aggregating their cleanups.
    pub fn effect(&self, effects: &Effects<T>) -> Option<Cleanup> {
        let implementations = self.schema().implementations();
        let resolved: Vec<_> = effects
            .resolve(self)
            .into_iter()
            .filter_map(|name| {
                let effect = implementations.effect(&name);
                if effect.is_none() {
                    tracing::warn!(effect = ?name, "no implementation found for effect");
                }
                effect
            })
            .collect();

        let cleanups = resolved
            .into_iter()
            .filter_map(|effect| effect(self))
            .collect();
        Cleanup::all(cleanups)
    }

    /// First candidate whose guard is absent or passes.
    pub fn choose<'t>(&self, candidates: &'t [Transition<T>]) -> Option<&'t Transition<T>> {
        candidates
            .iter()
            .find(|transition| transition.is_enabled(self))
    }

    /// Evaluate a computed value. Nothing is memoized.
    ///
    /// # Panics
    ///
    /// Panics if the schema has no computed function for `key`. Use
    /// [`Params::try_computed`] to handle the error instead.
    pub fn computed(&self, key: &T::Computed) -> T::Value {
        match self.try_computed(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_computed(&self, key: &T::Computed) -> Result<T::Value, MachineError> {
        let compute = self.schema().computed_fn(key)?;
        Ok(compute(&ComputedParams::new(self.clone())))
    }
}
