//! Error types for store operations.

use thiserror::Error;

/// Errors raised by the quad store and its persistence surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("property already declared with different data: {0}")]
    DuplicateProperty(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("property kind mismatch: {0}")]
    PropertyKindMismatch(String),

    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("jsonl parse failed at line {0}: {1}")]
    Parse(usize, String),

    #[error("jsonl serialize failed: {0}")]
    Serialize(String),

    #[error("io failure: {0}")]
    Io(String),
}
