//! Error types and result alias.
//!
//! Every façade and driver operation returns [`DbResult<T>`]. Drivers map
//! their engine-specific failures into the variants below so callers can
//! match on one canonical set regardless of which driver is configured.
//!
//! # Error Types
//!
//! - [`DbError::InvalidArgument`] - Arguments failed validation before any I/O
//! - [`DbError::Backend`] - Opaque failure reported by the storage engine
//! - [`DbError::Connection`] - Connection acquisition or transport failure
//! - [`DbError::Serialization`] - A value could not be encoded for storage
//! - [`DbError::Timeout`] - A bounded wait elapsed
//! - [`DbError::Config`] - Configuration values are invalid
//!
//! Malformed payloads found on read are not errors: drivers return the raw
//! stored value instead and count the degraded read (see
//! [`DecodeMonitor`](crate::codec::DecodeMonitor)).
//!
//! # Example
//!
//! ```
//! use instancedb::{DbError, DbResult};
//!
//! fn require_name(name: Option<&str>) -> DbResult<&str> {
//!     name.ok_or_else(|| DbError::invalid_argument("parameter or result name must be specified"))
//! }
//!
//! assert!(require_name(None).is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for instance database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur during instance database operations.
///
/// Errors preserve their source chain via the `#[source]` attribute.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum DbError {
    /// Call arguments are missing a required piece (id, owner, name, value).
    ///
    /// Raised synchronously, before any driver is touched.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Which requirement was violated.
        message: String,
    },

    /// Failure reported by the underlying storage engine.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
        /// The engine error that caused it.
        #[source]
        source: Option<BoxError>,
    },

    /// Connection acquisition or transport failure.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// A value could not be encoded into a storable payload.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// A bounded wait (for example connection acquisition) elapsed.
    #[error("Operation timeout")]
    Timeout,

    /// Configuration values are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Which setting is invalid and why.
        message: String,
    },
}

impl DbError {
    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Creates a new `Backend` error with the given message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), source: None }
    }

    /// Creates a new `Backend` error with a message and source error.
    #[must_use]
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Returns `true` if this error was raised by argument validation.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
