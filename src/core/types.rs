//! The type bundle every schema and service is parameterized by.

use super::state::{Event, Key, State};
use serde::Serialize;
use std::fmt::Debug;

/// Names the concrete types one component machine works with.
///
/// A schema author implements this on a marker type once per component:
///
/// ```rust
/// use statekit::core::{Event, MachineTypes};
/// use statekit::state_enum;
///
/// state_enum! {
///     pub enum ToggleState {
///         Off => "off",
///         On => "on",
///     }
/// }
///
/// #[derive(Clone, Debug)]
/// pub enum ToggleEvent {
///     Toggle,
/// }
///
/// impl Event for ToggleEvent {
///     type Kind = &'static str;
///     fn kind(&self) -> &'static str {
///         "TOGGLE"
///     }
/// }
///
/// pub struct Toggle;
///
/// impl MachineTypes for Toggle {
///     type State = ToggleState;
///     type Event = ToggleEvent;
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
/// ```
pub trait MachineTypes: Sized + 'static {
    /// Behavioral states.
    type State: State;
    /// Events delivered through `send`.
    type Event: Event;
    /// Input properties supplied by the host component.
    type Props: 'static;
    /// Context field names.
    type Context: Key;
    /// Values stored in context cells and returned by computed functions.
    type Value: Clone + Debug + Serialize + 'static;
    /// Computed value names.
    type Computed: Key;
    /// Action names.
    type Action: Key;
    /// Guard names.
    type Guard: Key;
    /// Effect names.
    type Effect: Key;
    /// State tags.
    type Tag: Key;
    /// Mutable handles owned by the service (measurement targets, timers).
    type Refs: Default + 'static;
}
