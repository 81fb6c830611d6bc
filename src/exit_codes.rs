//! Exit code constants for the keylock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args)
//! - 2: Configuration error
//! - 3: Runtime failure (collector thread)
//! - 4: Lock timeout

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments.
pub const USER_ERROR: i32 = 1;

/// Configuration could not be loaded or failed validation.
pub const CONFIG_ERROR: i32 = 2;

/// Runtime failure: a background thread could not be started.
pub const RUNTIME_FAILURE: i32 = 3;

/// Lock timeout: a bounded-retry acquisition ran out of time.
pub const LOCK_TIMEOUT: i32 = 4;
