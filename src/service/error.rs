//! Errors raised while creating a service or evaluating computed values.

use thiserror::Error;

/// Errors that can occur when running a machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("State '{state}' is not declared by the schema")]
    UndeclaredState { state: String },

    #[error("No computed map declared on the schema")]
    MissingComputedMap,

    #[error("No computed function declared for key {key}")]
    MissingComputed { key: String },

    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedSnapshot { found: u32, supported: u32 },
}
