//! Error types for the secret sharing engine.

use thiserror::Error;

/// Errors that can occur while sharing or requesting secrets.
///
/// The first four variants are the caller-facing taxonomy. The rest describe
/// failures of an injected collaborator and collapse to [`ErrorKind::Internal`].
#[derive(Debug, Error)]
pub enum Error {
    /// A policy or validation rule was violated.
    #[error("bad request: {reason}")]
    BadRequest {
        /// The rule that was violated.
        reason: String,
    },

    /// A required org context or credential is missing or wrong.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why the caller could not be authenticated.
        reason: String,
    },

    /// The caller is known but not allowed to perform the operation.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why access was denied.
        reason: String,
    },

    /// No live record matches the identifier.
    #[error("not found: {what}")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// Encryption or decryption failed.
    #[error("encryption error: {reason}")]
    EncryptionError {
        /// The reason encryption failed.
        reason: String,
    },

    /// Password hashing or hash parsing failed.
    #[error("password hash error: {reason}")]
    PasswordHashError {
        /// The reason hashing failed.
        reason: String,
    },

    /// The record store rejected or failed an operation.
    #[error("storage error: {reason}")]
    StorageError {
        /// The reason the storage operation failed.
        reason: String,
    },

    /// A permission or directory lookup failed.
    #[error("upstream error from {service}: {reason}")]
    UpstreamError {
        /// The collaborator that failed.
        service: &'static str,
        /// The reason it failed.
        reason: String,
    },

    /// The notification could not be handed to the mailer.
    #[error("notification error: {reason}")]
    NotificationError {
        /// The reason the mailer rejected the message.
        reason: String,
    },
}

/// Coarse classification of an [`Error`], suitable for mapping to a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Validation or policy violation.
    BadRequest,
    /// Missing org context or failed credential check.
    Unauthorized,
    /// Authorization denial or expired record.
    Forbidden,
    /// Unknown identifier.
    NotFound,
    /// A collaborator failed.
    Internal,
}

impl Error {
    /// Creates a [`Error::BadRequest`].
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Creates a [`Error::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Creates a [`Error::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a [`Error::StorageError`].
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::StorageError {
            reason: reason.into(),
        }
    }

    /// Returns the caller-facing classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::EncryptionError { .. }
            | Self::PasswordHashError { .. }
            | Self::StorageError { .. }
            | Self::UpstreamError { .. }
            | Self::NotificationError { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type alias for secret sharing operations.
pub type Result<T> = std::result::Result<T, Error>;
