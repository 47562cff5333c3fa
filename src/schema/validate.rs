//! Build-time resolution checks for schemas, using Validation.
//!
//! Every literal action, guard and effect name must have an implementation
//! and every transition target must be a declared state. All violations are
//! accumulated so an author fixes them in one pass. Names produced by
//! functions at dispatch time cannot be checked here; they are reported as
//! warnings when they fail to resolve.

use crate::core::{Guard, MachineTypes, State};
use crate::schema::error::SchemaViolation;
use crate::schema::{Actions, Effects, Schema, StateNode, Transition, TransitionTable};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<SchemaViolation>>;

/// Every violation in `schema`, in a stable order.
pub(crate) fn violations<T: MachineTypes>(schema: &Schema<T>) -> Vec<SchemaViolation> {
    match validate(schema) {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}

fn validate<T: MachineTypes>(schema: &Schema<T>) -> Check {
    let mut checks: Vec<Check> = Vec::new();

    check_actions(schema, "root entry", schema.entry.as_ref(), &mut checks);
    check_actions(schema, "root exit", schema.exit.as_ref(), &mut checks);
    check_effects(schema, "root effects", schema.effects.as_ref(), &mut checks);
    check_table(schema, "machine", &schema.on, &mut checks);

    let mut states: Vec<(&T::State, &StateNode<T>)> = schema.states.iter().collect();
    states.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));

    for (state, node) in states {
        let name = state.name();
        check_actions(
            schema,
            &format!("state '{name}' entry"),
            node.entry_actions(),
            &mut checks,
        );
        check_actions(
            schema,
            &format!("state '{name}' exit"),
            node.exit_actions(),
            &mut checks,
        );
        check_effects(
            schema,
            &format!("state '{name}' effects"),
            node.state_effects(),
            &mut checks,
        );
        check_table(schema, &format!("state '{name}'"), node.table(), &mut checks);
    }

    // Accumulate ALL failures using all_vec
    Validation::all_vec(checks).map(|_| ())
}

fn check_table<T: MachineTypes>(
    schema: &Schema<T>,
    site: &str,
    table: &TransitionTable<T>,
    checks: &mut Vec<Check>,
) {
    let mut kinds: Vec<_> = table.iter().collect();
    kinds.sort_by_key(|(kind, _)| format!("{kind:?}"));

    for (kind, candidates) in kinds {
        let event = format!("{kind:?}");
        for transition in candidates {
            let site = format!("{site} on {event}");
            checks.push(check_target(schema, &site, &event, transition));
            if let Some(guard) = transition.guard() {
                check_guard(schema, &site, guard, checks);
            }
            check_actions(schema, &site, Some(transition.actions()), checks);
        }
    }
}

fn check_target<T: MachineTypes>(
    schema: &Schema<T>,
    site: &str,
    event: &str,
    transition: &Transition<T>,
) -> Check {
    match transition.target() {
        Some(target) if !schema.is_declared(target) => {
            Validation::fail(SchemaViolation::UnknownTarget {
                site: site.to_string(),
                event: event.to_string(),
                target: target.name().to_string(),
            })
        }
        _ => Validation::success(()),
    }
}

fn check_guard<T: MachineTypes>(
    schema: &Schema<T>,
    site: &str,
    guard: &Guard<T>,
    checks: &mut Vec<Check>,
) {
    for name in guard.names() {
        let check = if schema.implementations().guard(name).is_some() {
            Validation::success(())
        } else {
            Validation::fail(SchemaViolation::UnknownGuard {
                site: site.to_string(),
                name: format!("{name:?}"),
            })
        };
        checks.push(check);
    }
}

fn check_actions<T: MachineTypes>(
    schema: &Schema<T>,
    site: &str,
    actions: Option<&Actions<T>>,
    checks: &mut Vec<Check>,
) {
    let Some(actions) = actions else { return };
    for name in actions.literal() {
        let check = if schema.implementations().action(name).is_some() {
            Validation::success(())
        } else {
            Validation::fail(SchemaViolation::UnknownAction {
                site: site.to_string(),
                name: format!("{name:?}"),
            })
        };
        checks.push(check);
    }
}

fn check_effects<T: MachineTypes>(
    schema: &Schema<T>,
    site: &str,
    effects: Option<&Effects<T>>,
    checks: &mut Vec<Check>,
) {
    let Some(effects) = effects else { return };
    for name in effects.literal() {
        let check = if schema.implementations().effect(name).is_some() {
            Validation::success(())
        } else {
            Validation::fail(SchemaViolation::UnknownEffect {
                site: site.to_string(),
                name: format!("{name:?}"),
            })
        };
        checks.push(check);
    }
}
