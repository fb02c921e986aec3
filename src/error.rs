//! Error types for the scoring engine.
//!
//! Errors are classified by who has to act on them:
//! - Validation: the caller passed garbage — never retried.
//! - Store: the ledger or score store failed — retryable, captured per-user
//!   in batch paths.
//! - Invariant: a programming defect surfaced in data — logged loudly,
//!   never silently corrected.
//!
//! "No ledger history for this user" is deliberately not an error anywhere
//! in the engine: it is zero history, and repair against it is a no-op.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl EngineError {
    /// True when the error is a caller bug and retrying is pointless.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    /// True when the error may clear on retry (transient store trouble).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Store(_))
    }

    /// True when the error indicates a defect rather than bad input or a
    /// flaky store.
    pub fn is_defect(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_disjoint() {
        let v = EngineError::Validation("bad user id".into());
        assert!(v.is_caller_error());
        assert!(!v.is_retryable());
        assert!(!v.is_defect());

        let i = EngineError::Invariant("total mismatch".into());
        assert!(i.is_defect());
        assert!(!i.is_caller_error());
        assert!(!i.is_retryable());
    }
}
