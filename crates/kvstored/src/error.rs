//! Protocol-level errors (§7) — the daemon crate's own error enum,
//! distinct from `kvstore_core::EngineError` and
//! `kvstore_store::StoreError`. A `Protocol` error is reported to the
//! peer and the connection continues; a `Fatal` error is reported
//! best-effort and the connection is closed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Fatal(String),
}

impl ProtocolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ProtocolError::Protocol(msg) | ProtocolError::Fatal(msg) => msg,
        }
    }
}
