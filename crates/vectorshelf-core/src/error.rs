//! Error kinds surfaced by the vector index subsystem.
//!
//! Every variant here corresponds to one of the error kinds mutations and
//! queries can raise. `InternalInconsistency` is the one kind that is never
//! propagated to a caller as a failed operation — it is logged and the
//! offending id is dropped from whatever result was being built.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: Uuid },

    #[error("embedding dimension mismatch: library expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector has zero (or near-zero) magnitude and cannot be normalized")]
    DegenerateVector,

    #[error("embedding provider failed: {0}")]
    EmbeddingProviderError(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
