//! Configuration model for keylock.
//!
//! This module defines the [`LockerConfig`] struct that parameterizes a
//! [`crate::KeyLocker`]. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for every field, and validation of
//! config values.

mod model;
mod operations;
mod types;


// Re-export public API
pub use model::LockerConfig;
