//! Recoverable error conditions.
//!
//! Invariant violations (unique-table corruption, refcount underflow) are
//! defects, not errors: they panic via assertions instead of surfacing here,
//! since continuing would risk silently wrong numeric results.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The operation has no decision-diagram representation as a linear
    /// operator (measurement, reset); it must be routed through a non-DD
    /// execution path.
    #[error("operation '{0}' is not unitary and has no DD representation")]
    NotUnitary(&'static str),

    /// A serialized record did not match the grammar, or referenced a child
    /// index that was never emitted (or only emitted later).
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
