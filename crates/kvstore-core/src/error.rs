//! Error taxonomy for the KV engine.
//!
//! This is the closed set from the engine's perspective: invalid
//! input, absent keys, tag mismatches, and resource exhaustion. I/O
//! and wire-protocol errors live in [`crate::codec`] and `kvstored`
//! respectively, and convert into this enum's siblings at their own
//! layer rather than folding everything into one type.

use thiserror::Error;

/// Errors a store operation can fail with.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("key must be non-empty")]
    EmptyKey,

    #[error("key exceeds maximum length of {max} bytes")]
    KeyTooLarge { max: usize },

    #[error("value exceeds maximum length of {max} bytes")]
    ValueTooLarge { max: usize },

    #[error("key not found")]
    NotFound,

    #[error("value is not of the requested type")]
    TypeMismatch,

    #[error("arena allocation failed")]
    OutOfMemory,
}

pub type EngineResult<T> = Result<T, EngineError>;
