//! Error taxonomy for the routing core.
//!
//! Kinds, not type names: each variant maps onto the propagation policy the
//! daemon follows. Inbound-message and config-parse errors are logged and
//! dropped by the caller; `Timeout`/`Transport` against the FIB are retried
//! with backoff; `Fatal` tears the daemon down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed text config or malformed wire message.
    #[error("parse error: {0}")]
    Parse(String),

    /// Numeric value violates metric metadata or TLV constraints.
    #[error("value out of range: {field} = {value} ({constraint})")]
    ValueOutOfRange {
        field: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// Lookup miss in a DB that required a hit.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate origin registration, duplicate dupset hit (non-fatal to caller).
    #[error("already present: {0}")]
    AlreadyPresent(String),

    /// FIB op, interface query, or ACK wait exceeded its deadline.
    #[error("timeout waiting for {0}")]
    Timeout(String),

    /// Socket or FIB channel I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Out-of-memory, invariant violation, or unrecoverable driver loss.
    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn out_of_range(
        field: &'static str,
        value: impl std::fmt::Display,
        constraint: &'static str,
    ) -> Self {
        CoreError::ValueOutOfRange {
            field,
            value: value.to_string(),
            constraint,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        CoreError::Parse(msg.into())
    }
}
