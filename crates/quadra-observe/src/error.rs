//! Error types for the observation layer.

use quadra_store::StoreError;
use thiserror::Error;

/// Errors raised by the observation and annotation surface.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// The requested property is not a declared annotation property.
    #[error("unknown annotation property: {0}")]
    UnknownAttribute(String),

    /// The relation's subject or predicate does not resolve to a known
    /// entity; no reification quads were written.
    #[error("invalid annotated relation: {0}")]
    InvalidRelation(String),

    /// The owning world was dropped while a handle was still live.
    #[error("world has been dropped")]
    WorldDropped,

    #[error(transparent)]
    Store(#[from] StoreError),
}
