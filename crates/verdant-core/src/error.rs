//! Error types for core value parsing.

use thiserror::Error;

/// Errors produced when parsing a [`Principal`](crate::Principal).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalError {
    /// The principal string was empty.
    #[error("principal must not be empty")]
    Empty,

    /// The principal contained whitespace or control characters.
    #[error("principal contains invalid character: {0:?}")]
    InvalidCharacter(char),

    /// The principal exceeded the maximum length.
    #[error("principal is {len} characters, exceeding the {max} character limit")]
    TooLong {
        /// Observed length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
}

/// Result type for principal parsing.
pub type PrincipalResult<T> = Result<T, PrincipalError>;
