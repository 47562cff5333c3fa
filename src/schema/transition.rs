//! Transition candidates.

use crate::core::{Guard, MachineTypes};
use crate::schema::Actions;
use crate::service::Params;
use std::fmt;

/// A transition candidate for one event kind.
///
/// Without a target the transition is internal: only its actions run and the
/// active state is neither exited nor re-entered.
///
/// # Example
///
/// ```rust
/// # use statekit::core::{Event, MachineTypes};
/// # use statekit::state_enum;
/// # state_enum! { pub enum S { Idle => "idle", Open => "open" } }
/// # #[derive(Clone, Debug)] pub struct E;
/// # impl Event for E { type Kind = &'static str; fn kind(&self) -> &'static str { "E" } }
/// # pub struct M;
/// # impl MachineTypes for M {
/// #     type State = S; type Event = E; type Props = ();
/// #     type Context = &'static str; type Value = serde_json::Value;
/// #     type Computed = &'static str; type Action = &'static str;
/// #     type Guard = &'static str; type Effect = &'static str;
/// #     type Tag = &'static str; type Refs = ();
/// # }
/// use statekit::schema::Transition;
///
/// let open: Transition<M> = Transition::to(S::Open)
///     .with_guard("isEnabled")
///     .with_actions(["focusContent", "invokeOnOpen"]);
///
/// assert_eq!(open.target(), Some(&S::Open));
/// assert!(!open.is_internal());
/// ```
pub struct Transition<T: MachineTypes> {
    target: Option<T::State>,
    actions: Actions<T>,
    guard: Option<Guard<T>>,
}

impl<T: MachineTypes> Transition<T> {
    /// Transition to `target`.
    pub fn to(target: T::State) -> Self {
        Self {
            target: Some(target),
            actions: Actions::default(),
            guard: None,
        }
    }

    /// Transition that stays in the active state.
    pub fn internal() -> Self {
        Self {
            target: None,
            actions: Actions::default(),
            guard: None,
        }
    }

    /// Set the actions to a literal list of names.
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = T::Action>) -> Self {
        self.actions = Actions::keys(actions);
        self
    }

    /// Compute the action names from the parameter bundle at dispatch time.
    pub fn with_actions_fn<F>(mut self, actions: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> Vec<T::Action> + Send + Sync + 'static,
    {
        self.actions = Actions::from_fn(actions);
        self
    }

    /// Guard by a named implementation.
    pub fn with_guard(mut self, name: T::Guard) -> Self {
        self.guard = Some(Guard::Named(name));
        self
    }

    /// Guard by an inline predicate.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Params<'_, T>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Guard by an arbitrary guard expression.
    pub fn guarded_by(mut self, guard: Guard<T>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn target(&self) -> Option<&T::State> {
        self.target.as_ref()
    }

    pub fn actions(&self) -> &Actions<T> {
        &self.actions
    }

    pub fn guard(&self) -> Option<&Guard<T>> {
        self.guard.as_ref()
    }

    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }

    /// Whether the guard is absent or passes.
    pub fn is_enabled(&self, params: &Params<'_, T>) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard.check(params))
    }
}

impl<T: MachineTypes> Clone for Transition<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            actions: self.actions.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T: MachineTypes> fmt::Debug for Transition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("actions", &self.actions)
            .field("guard", &self.guard)
            .finish()
    }
}
