//! Core machine types.
//!
//! This module contains the building blocks shared by schemas and services:
//! - State and event traits, and the `MachineTypes` bundle
//! - Reactive `Bindable` cells
//! - Guard predicates for transition control
//! - Bounded transition history

mod bindable;
mod guard;
mod history;
mod state;
mod types;

pub use bindable::{default_hash, Bindable, HashFn, SubscriptionId};
pub use guard::{Guard, GuardFn};
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_LIMIT};
pub(crate) use state::kind_label;
pub use state::{Event, Key, State};
pub use types::MachineTypes;
