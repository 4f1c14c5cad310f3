//! Error taxonomy.
//!
//! One enum for every fallible operation in the crate. Kinds mirror the
//! propagation rules of the spec one-for-one: `NotFound`/`InvalidTransition`
//! surface verbatim to the caller, `InvariantViolation` aborts the current
//! turn, `Busy` means "try again", `Expired` is swallowed internally by the
//! lock manager (reap + retry), `Cancelled` propagates verbatim.

use crate::domain::Status;

/// Everything that can go wrong inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: Status, to: Status },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("resource busy: {0}")]
    Busy(String),

    #[error("lease expired: {0}")]
    Expired(String),

    #[error("cancelled")]
    Cancelled,

    #[error("transient io error: {0}")]
    TransientIo(String),

    #[error("fatal io error: {0}")]
    FatalIo(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
