//! State and event traits for machine schemas.
//!
//! States are the behavioral positions a component can be in (`idle`,
//! `open`, `dragging`). Events are what the presentation layer sends in
//! response to user input. Both are plain values owned by the schema author.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Bound shared by every symbolic name a schema uses as a map key.
///
/// Implemented for any type that is cloneable, hashable and thread-safe, so
/// closed enums and `&'static str` both work as action, guard, effect,
/// context, computed and tag names.
pub trait Key: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<K> Key for K where K: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Trait for machine states.
///
/// # Required Traits
///
/// - `Key`: states index the schema's state table and the effect registry
/// - `Serialize` + `Deserialize`: states are captured in resume snapshots
///
/// # Example
///
/// ```rust
/// use statekit::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Disclosure {
///     Closed,
///     Open,
/// }
///
/// impl State for Disclosure {
///     fn name(&self) -> &str {
///         match self {
///             Self::Closed => "closed",
///             Self::Open => "open",
///         }
///     }
/// }
///
/// assert_eq!(Disclosure::Open.name(), "open");
/// ```
pub trait State: Key + Serialize + DeserializeOwned {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}

/// Trait for machine events.
///
/// Transition tables are keyed by [`Event::Kind`], so events can carry
/// payloads (`Select(index)`) while still being looked up by type. Kinds
/// are serializable so the history journal can record them by name.
///
/// # Example
///
/// ```rust
/// use statekit::core::Event;
///
/// #[derive(Clone, Debug)]
/// enum TabsEvent {
///     Select(usize),
///     Focus,
/// }
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize)]
/// enum TabsEventKind {
///     Select,
///     Focus,
/// }
///
/// impl Event for TabsEvent {
///     type Kind = TabsEventKind;
///
///     fn kind(&self) -> TabsEventKind {
///         match self {
///             Self::Select(_) => TabsEventKind::Select,
///             Self::Focus => TabsEventKind::Focus,
///         }
///     }
/// }
///
/// assert_eq!(TabsEvent::Select(2).kind(), TabsEventKind::Select);
/// ```
pub trait Event: Clone + Debug + 'static {
    /// Discriminator used to look up transition candidates.
    type Kind: Key + Serialize;

    /// The kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// Plain label for an event kind: string and unit-variant kinds render
/// without quotes, anything else as its JSON encoding.
pub(crate) fn kind_label<K: Serialize + Debug>(kind: &K) -> String {
    match serde_json::to_value(kind) {
        Ok(serde_json::Value::String(label)) => label,
        Ok(value) => value.to_string(),
        Err(_) => format!("{kind:?}"),
    }
}
