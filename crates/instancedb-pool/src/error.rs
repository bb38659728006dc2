//! Error types for the pooled string-store driver.
//!
//! Engines report [`PoolError`]; the driver maps it into the generic
//! [`DbError`] before it reaches the façades.

use instancedb::DbError;
use thiserror::Error;

/// Result type alias for connection and pool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Errors reported by a [`ConnectionPool`](crate::ConnectionPool) or one of
/// its connections.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool could not hand out a connection.
    #[error("Connection acquisition failed: {0}")]
    Acquire(String),

    /// The pool was shut down.
    #[error("Pool is closed")]
    Closed,

    /// A connection broke while running a command.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine rejected a command.
    #[error("Command failed: {0}")]
    Command(String),

    /// A connection could not be handed back to its pool.
    #[error("Connection release failed: {0}")]
    Release(String),
}

impl From<PoolError> for DbError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Acquire(_) | PoolError::Closed | PoolError::Transport(_) => {
                let message = err.to_string();
                DbError::connection_with_source(message, err)
            },
            PoolError::Command(_) | PoolError::Release(_) => {
                let message = err.to_string();
                DbError::backend_with_source(message, err)
            },
        }
    }
}
