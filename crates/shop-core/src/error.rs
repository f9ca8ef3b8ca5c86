//! # Error Types
//!
//! ```text
//! ValidationError ──► CoreError ──► ClientError (shop-sync) ──► error stream
//!   bad input          cart rules      transport, auth, storage
//! ```
//!
//! Messages are shown to end users as-is, so they are phrased for people,
//! not for logs.

use thiserror::Error;

/// A cart rule was broken.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("No cart line for product {0}")]
    LineNotFound(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Input rejected before any request is sent.
///
/// `field` is the wire name of the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be at least 1")]
    MustBePositive { field: &'static str },

    #[error("{field} is not valid: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
}

impl ValidationError {
    /// Wire name of the field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
