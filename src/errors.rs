//! Unified error type for the custody backend.
//!
//! Every layer returns [`Result`]. The HTTP layer turns each variant into a
//! status code and a `{"message": ...}` body (see `api::error`).

use thiserror::Error;

/// Application error.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Request data failed validation
    #[error("{message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Missing or bad credentials
    #[error("{message}")]
    Unauthorized {
        /// Human-readable reason
        message: String,
    },

    /// Authenticated but not allowed
    #[error("{message}")]
    Forbidden {
        /// Human-readable reason
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name (e.g. `"acta"`)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation conflicts with the current state of a record
    #[error("{message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    /// A stock decrement would make stock negative
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Item description
        item: String,
        /// Current stock
        available: i32,
        /// Requested quantity
        requested: i32,
    },

    /// Signature token past its expiry
    #[error("Signature token has expired")]
    TokenExpired,

    /// Signature token already used or revoked
    #[error("Signature token is no longer valid")]
    TokenUsed,

    /// Outgoing mail could not be delivered
    #[error("Mail delivery failed: {message}")]
    Mail {
        /// Delivery failure detail
        message: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT encoding/decoding failure
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`] keyed by a numeric id.
    #[must_use]
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
