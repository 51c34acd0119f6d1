//! Errors used throughout the engine core.
//!
//! `ChessError` is the single error type returned by position setup, move
//! application, option parsing and search. Its variants follow four failure
//! classes:
//! - `MalformedInput` / `InvalidSearchLimits`: bad caller input. Reported and
//!   recovered from; the engine keeps whatever valid state preceded the call.
//! - `InvariantViolation`: internal corruption (caches out of sync, missing
//!   king, undo with an empty history). Fatal to the current search.
//! - `ResourceUnavailable`: an external resource such as tablebase files could
//!   not be used. Callers degrade to "no information".
//!
//! Cancellation of a running search is not an error and has no variant.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// Bad board description, move text or option value.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Search limits that cannot bound a search.
    #[error("invalid search limits: {0}")]
    InvalidSearchLimits(String),

    /// Internal state no longer satisfies its invariants.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An external resource could not be opened or read.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl ChessError {
    #[inline]
    pub fn malformed(msg: impl Into<String>) -> Self {
        ChessError::MalformedInput(msg.into())
    }

    #[inline]
    pub fn invariant(msg: impl Into<String>) -> Self {
        ChessError::InvariantViolation(msg.into())
    }

    /// True for errors that must abort a running search.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChessError::InvariantViolation(_))
    }
}

pub type ChessResult<T> = Result<T, ChessError>;

#[cfg(test)]
mod tests {
    use super::ChessError;

    #[test]
    fn display_includes_category_and_detail() {
        let err = ChessError::malformed("bad side token 'x'");
        assert_eq!(err.to_string(), "malformed input: bad side token 'x'");
        assert!(!err.is_fatal());
        assert!(ChessError::invariant("two white kings").is_fatal());
    }
}
