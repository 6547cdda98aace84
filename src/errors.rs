//! Unified error type for the ledger.
//!
//! Every service function returns [`Result`]. Callers that sit in front of the
//! core (request handlers, CLIs) map an error to a response class with
//! [`Error::kind`] and decide whether a retry makes sense with
//! [`Error::is_retryable`].

use thiserror::Error;

/// Broad response class of an [`Error`], independent of any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced entity does not exist (404-equivalent)
    NotFound,
    /// The actor may not perform the operation (403-equivalent)
    Forbidden,
    /// The request is invalid for the current state or input (400-equivalent)
    BadRequest,
    /// Infrastructure failure (500-equivalent)
    Internal,
}

/// All errors produced by the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store failure; the surrounding transaction has been rolled back
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// The entity id is unknown
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type name, e.g. `"expense"`
        entity: &'static str,
        /// Requested id
        id: i64,
    },

    /// The actor is not allowed to act on the entity
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden {
        /// Acting user
        user_id: i64,
        /// Human readable description of the refused action
        action: String,
    },

    /// The entity is not in a state that permits the requested transition
    #[error("Cannot {action} {entity} {id}: status is {status}")]
    InvalidStateTransition {
        /// Entity type name
        entity: &'static str,
        /// Entity id
        id: i64,
        /// Current status of the entity
        status: String,
        /// Attempted action
        action: &'static str,
    },

    /// Amount is zero, negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Payment larger than what is still owed on the invoice
    #[error("Payment amount ({amount:.2}) exceeds remaining balance ({remaining:.2})")]
    AmountExceedsRemaining {
        /// Requested payment
        amount: f64,
        /// `invoice.amount - invoice.paid_amount` at validation time
        remaining: f64,
    },

    /// Any other input problem (malformed date, empty item list, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What is wrong with the input
        message: String,
    },
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Response class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidStateTransition { .. }
            | Self::InvalidAmount { .. }
            | Self::AmountExceedsRemaining { .. }
            | Self::Validation { .. } => ErrorKind::BadRequest,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::EnvVar(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether repeating the same call could succeed without any state change.
    ///
    /// Only store failures qualify: the transaction rolled back cleanly, so a
    /// retry starts from the same state. Business rule violations fail
    /// identically on every attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::NotFound {
                entity: "expense",
                id: 1
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::InvalidStateTransition {
                entity: "invoice",
                id: 3,
                status: "APPROVED".to_string(),
                action: "approve",
            }
            .kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            Error::AmountExceedsRemaining {
                amount: 101.0,
                remaining: 100.0
            }
            .kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            Error::Forbidden {
                user_id: 7,
                action: "create expense".to_string()
            }
            .kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_only_database_errors_are_retryable() {
        let db_err = Error::Database(sea_orm::DbErr::Custom("lock timeout".to_string()));
        assert!(db_err.is_retryable());
        assert_eq!(db_err.kind(), ErrorKind::Internal);

        let state_err = Error::InvalidStateTransition {
            entity: "expense",
            id: 1,
            status: "REJECTED".to_string(),
            action: "approve",
        };
        assert!(!state_err.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::AmountExceedsRemaining {
            amount: 101.0,
            remaining: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "Payment amount (101.00) exceeds remaining balance (100.00)"
        );

        let err = Error::InvalidStateTransition {
            entity: "budget_request",
            id: 4,
            status: "APPROVED".to_string(),
            action: "reject",
        };
        assert_eq!(
            err.to_string(),
            "Cannot reject budget_request 4: status is APPROVED"
        );
    }
}
