//! Error types for keylock.
//!
//! Uses thiserror for derive macros. The lock manager itself only ever
//! returns [`KeylockError::LockTimeout`]; the remaining variants belong to
//! configuration loading and the CLI.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for keylock operations.
#[derive(Error, Debug)]
pub enum KeylockError {
    /// A bounded-retry acquisition ran past its deadline or was cancelled.
    #[error("lock timeout: key '{key}' not acquired after {waited:?}")]
    LockTimeout {
        /// The key that could not be locked.
        key: String,
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// Configuration could not be read, parsed or validated.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),

    /// A background thread could not be started or failed.
    #[error("Runtime failure: {0}")]
    RuntimeError(String),
}

impl KeylockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            KeylockError::LockTimeout { .. } => exit_codes::LOCK_TIMEOUT,
            KeylockError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            KeylockError::UserError(_) => exit_codes::USER_ERROR,
            KeylockError::RuntimeError(_) => exit_codes::RUNTIME_FAILURE,
        }
    }

    /// Whether this error is a lock timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, KeylockError::LockTimeout { .. })
    }
}

/// Result type alias for keylock operations.
pub type Result<T> = std::result::Result<T, KeylockError>;
