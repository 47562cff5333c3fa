//! Statekit: a reactive state machine runtime for UI component behavior
//!
//! A component's interaction logic (tabs, carousels, date pickers) is written
//! once as a declarative [`Schema`]: states, guarded transitions, entry and
//! exit actions, effects with cleanups, computed values and a reactive
//! context. A [`Service`] instantiates the schema for one mounted component
//! and runs it: events are queued, resolved into transitions, and every
//! action and effect runs in a fixed, deterministic order.
//!
//! # Core Concepts
//!
//! - **Bindable**: a reactive value cell with hash-based change detection
//! - **Schema**: the immutable machine description, validated when built
//! - **Service**: the running instance, owning context, refs and effects
//! - **Params**: the bundle every action, guard and effect receives
//!
//! # Example
//!
//! ```rust
//! use statekit::core::{Bindable, Event, MachineTypes};
//! use statekit::schema::{Schema, StateNode, Transition};
//! use statekit::service::Service;
//! use statekit::state_enum;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! state_enum! {
//!     pub enum Disclosure {
//!         Closed => "closed",
//!         Open => "open",
//!     }
//! }
//!
//! #[derive(Clone, Debug)]
//! pub enum DisclosureEvent {
//!     Toggle,
//! }
//!
//! impl Event for DisclosureEvent {
//!     type Kind = &'static str;
//!     fn kind(&self) -> &'static str {
//!         "TOGGLE"
//!     }
//! }
//!
//! pub struct Collapsible;
//!
//! impl MachineTypes for Collapsible {
//!     type State = Disclosure;
//!     type Event = DisclosureEvent;
//!     type Props = ();
//!     type Context = &'static str;
//!     type Value = Value;
//!     type Computed = &'static str;
//!     type Action = &'static str;
//!     type Guard = &'static str;
//!     type Effect = &'static str;
//!     type Tag = &'static str;
//!     type Refs = ();
//! }
//!
//! let schema = Schema::<Collapsible>::builder()
//!     .initial(Disclosure::Closed)
//!     .context(|_, _| vec![("toggles", Bindable::new(json!(0)))])
//!     .state(
//!         Disclosure::Closed,
//!         StateNode::new().on(
//!             "TOGGLE",
//!             Transition::to(Disclosure::Open).with_actions(["count"]),
//!         ),
//!     )
//!     .state(
//!         Disclosure::Open,
//!         StateNode::new().on("TOGGLE", Transition::to(Disclosure::Closed)),
//!     )
//!     .action("count", |p| {
//!         p.context()
//!             .update(&"toggles", |n| json!(n.as_i64().unwrap_or(0) + 1))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let service = Service::new(Arc::new(schema), ()).unwrap();
//! service.start();
//! service.send(DisclosureEvent::Toggle);
//! service.run_pending();
//!
//! assert!(service.state().matches(&[Disclosure::Open]));
//! assert_eq!(service.context().get(&"toggles"), Some(json!(1)));
//! ```

pub mod context;
pub mod core;
pub mod refs;
pub mod schema;
pub mod scope;
pub mod service;
pub mod snapshot;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use crate::context::Context;
pub use crate::core::{Bindable, Event, Guard, MachineTypes, State, StateHistory, StateTransition};
pub use crate::refs::Refs;
pub use crate::schema::{BuildError, Schema, SchemaBuilder, StateNode, Transition};
pub use crate::scope::Scope;
pub use crate::service::{
    Cleanup, EventSender, MachineError, MachineStatus, Params, Service, ServiceOptions,
};
pub use crate::snapshot::Snapshot;
