//! Error types for the synchronization layer.
//!
//! Every public boundary of the sync layer returns one of these as a typed
//! result. Callers decide presentation: redirect to login, offer a retry,
//! or show a form message.

use thiserror::Error;

/// Result type alias for sync-layer operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Session-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The session is missing, invalid or expired.
    ///
    /// Always accompanied by the session being cleared; callers redirect to login.
    #[error("Session is missing or has expired")]
    Unauthorized,

    /// Login was refused by the backend.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials {
        /// Message returned by the backend, or a generic one
        message: String,
    },
}

/// Transport failures. Never conflated with [`AuthError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The transport gave up waiting for a response.
    #[error("Request timed out")]
    Timeout,

    /// The connection could not be established (DNS, refused, TLS).
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other failure while sending or reading the response.
    #[error("Request failed: {0}")]
    Transport(String),
}

/// Malformed user input on forms.
///
/// Raised by the constructors in [`crate::validation`]; it never reaches the
/// sync layer because a request is only built from validated input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left empty.
    #[error("Field '{field}' is required")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// New password and its confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// New password is shorter than the minimum.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum accepted length
        min: usize,
    },

    /// A numeric field could not be parsed or was negative.
    #[error("Field '{field}' must be a non-negative number")]
    InvalidNumber {
        /// Name of the offending field
        field: &'static str,
    },

    /// Cart quantity must be at least one.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// Quantity that was rejected
        quantity: u32,
    },
}

/// Errors returned across the public boundary of the sync layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Session invalid or expired.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transport failure.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The backend answered with a non-success status other than 401.
    #[error("Request rejected (status {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Response body could not be parsed.
    #[error("Response parsing failed: {0}")]
    Decode(String),

    /// Request body could not be serialized.
    #[error("Request serialization failed: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Returns `true` if the caller should send the user to login.
    ///
    /// # Examples
    ///
    /// ```
    /// # use boxoffice_core::{AuthError, NetworkError, SyncError};
    /// assert!(SyncError::from(AuthError::Unauthorized).is_unauthorized());
    /// assert!(!SyncError::from(NetworkError::Timeout).is_unauthorized());
    /// ```
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Auth(AuthError::Unauthorized))
    }

    /// Returns `true` if a user-initiated retry can reasonably succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use boxoffice_core::{AuthError, NetworkError, SyncError};
    /// assert!(SyncError::from(NetworkError::Timeout).is_retryable());
    /// assert!(SyncError::Rejected { status: 503, message: String::new() }.is_retryable());
    /// assert!(!SyncError::from(AuthError::Unauthorized).is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Auth(_) | Self::Decode(_) | Self::Serialization(_) => false,
        }
    }
}
