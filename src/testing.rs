//! Shared fixtures for unit tests.

use crate::core::{Bindable, Event, MachineTypes};
use crate::schema::{Schema, SchemaBuilder, StateNode};
use crate::service::{Cleanup, Params, Service};
use crate::state_enum;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

state_enum! {
    pub enum FixtureState {
        Idle => "idle",
        Open => "open",
        Closing => "closing",
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixtureEvent(pub &'static str);

impl Event for FixtureEvent {
    type Kind = &'static str;

    fn kind(&self) -> &'static str {
        self.0
    }
}

pub struct Fixture;

impl MachineTypes for Fixture {
    type State = FixtureState;
    type Event = FixtureEvent;
    type Props = Value;
    type Context = &'static str;
    type Value = Value;
    type Computed = &'static str;
    type Action = &'static str;
    type Guard = &'static str;
    type Effect = &'static str;
    type Tag = &'static str;
    type Refs = Vec<String>;
}

/// Every fixture state declared, a `count` context field, `always`/`never`
/// guards and a `record` action incrementing `count`.
pub fn fixture_builder() -> SchemaBuilder<Fixture> {
    Schema::<Fixture>::builder()
        .initial(FixtureState::Idle)
        .state(FixtureState::Idle, StateNode::new())
        .state(FixtureState::Open, StateNode::new())
        .state(FixtureState::Closing, StateNode::new())
        .context(|_, _| vec![("count", Bindable::new(json!(0)))])
        .guard("always", |_| true)
        .guard("never", |_| false)
        .action("record", |p| {
            p.context()
                .update(&"count", |v| json!(v.as_i64().unwrap_or(0) + 1))
        })
}

pub fn fixture_schema(
    configure: impl FnOnce(SchemaBuilder<Fixture>) -> SchemaBuilder<Fixture>,
) -> Schema<Fixture> {
    configure(fixture_builder()).build().unwrap()
}

pub fn fixture_service(
    configure: impl FnOnce(SchemaBuilder<Fixture>) -> SchemaBuilder<Fixture>,
) -> Service<Fixture> {
    Service::new(Arc::new(fixture_schema(configure)), Value::Null).unwrap()
}

/// Thread-safe call log for asserting invocation order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries recorded so far, clearing the log.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    /// Action appending `entry`.
    pub fn action(
        &self,
        entry: &'static str,
    ) -> impl Fn(&Params<'_, Fixture>) + Send + Sync + 'static {
        let log = self.clone();
        move |_: &Params<'_, Fixture>| log.push(entry)
    }

    /// Effect appending `"{name} start"`, with a cleanup appending
    /// `"{name} cleanup"`.
    pub fn effect(
        &self,
        name: &'static str,
    ) -> impl Fn(&Params<'_, Fixture>) -> Option<Cleanup> + Send + Sync + 'static {
        let log = self.clone();
        move |_: &Params<'_, Fixture>| {
            log.push(format!("{name} start"));
            let log = log.clone();
            Some(Cleanup::new(move || log.push(format!("{name} cleanup"))))
        }
    }
}
