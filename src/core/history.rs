//! State transition history tracking.
//!
//! A service keeps a bounded journal of the state changes it committed, so
//! adapters and tests can inspect the path a component took.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of transitions a service keeps unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Record of a single committed state change.
///
/// `from` is `None` for the first entry of an activation.
///
/// # Example
///
/// ```rust
/// use statekit::core::{State, StateTransition};
/// use statekit::state_enum;
/// use chrono::Utc;
///
/// state_enum! {
///     enum MenuState {
///         Closed => "closed",
///         Open => "open",
///     }
/// }
///
/// let transition = StateTransition {
///     from: Some(MenuState::Closed),
///     to: MenuState::Open,
///     event: Some("OPEN".to_string()),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to.name(), "open");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left, `None` when entering from the uninitialized marker
    pub from: Option<S>,
    /// The state being entered
    pub to: S,
    /// Label of the event kind that caused the change
    pub event: Option<String>,
    /// When the change was committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of state transitions.
///
/// Once `limit` entries are stored, recording drops the oldest one. A limit
/// of zero disables recording.
///
/// # Example
///
/// ```rust
/// use statekit::core::{StateHistory, StateTransition};
/// use statekit::state_enum;
/// use chrono::Utc;
///
/// state_enum! {
///     enum Step {
///         A,
///         B,
///         C,
///     }
/// }
///
/// let mut history = StateHistory::with_limit(2);
/// for (from, to) in [(None, Step::A), (Some(Step::A), Step::B), (Some(Step::B), Step::C)] {
///     history.record(StateTransition { from, to, event: None, timestamp: Utc::now() });
/// }
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.get_path(), vec![&Step::A, &Step::B, &Step::C]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: VecDeque<StateTransition<S>>,
    limit: usize,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create an empty history with [`DEFAULT_HISTORY_LIMIT`].
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty history keeping at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    /// Record a transition, evicting the oldest entry when full.
    pub fn record(&mut self, transition: StateTransition<S>) {
        if self.limit == 0 {
            return;
        }
        while self.transitions.len() >= self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Starts with the `from` state of the oldest retained entry (when it
    /// has one), followed by the `to` state of each entry.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.front().and_then(|t| t.from.as_ref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the oldest and newest retained entries.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Retained transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition<S>> {
        self.transitions.iter()
    }

    /// Most recent transition.
    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every retained entry.
    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
