//! Build errors for machine schemas.

use thiserror::Error;

/// Errors that can occur when building a schema.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) or .initial_fn(select) before .build()")]
    MissingInitialState,

    #[error("No states declared. Add at least one state with .state(state, node)")]
    NoStates,

    #[error("Schema failed validation with {count} violation(s)")]
    Invalid {
        count: usize,
        violations: Vec<SchemaViolation>,
    },
}

/// A reference in a schema that does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("{site}: event {event} targets undeclared state '{target}'")]
    UnknownTarget {
        site: String,
        event: String,
        target: String,
    },

    #[error("{site}: no implementation for action {name}")]
    UnknownAction { site: String, name: String },

    #[error("{site}: no implementation for guard {name}")]
    UnknownGuard { site: String, name: String },

    #[error("{site}: no implementation for effect {name}")]
    UnknownEffect { site: String, name: String },
}
