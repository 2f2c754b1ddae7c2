//! Error types.

use thiserror::Error;

/// Errors surfaced by the looping engine.
///
/// Only two kinds are fatal by nature: a bad [`EngineConfig`](crate::EngineConfig)
/// prevents the engine from being created, and a failed audio backend halts it.
/// Out-of-range loop indices coming from the control path are never errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LooperError {
    /// Invalid initialization parameters
    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    /// Device unavailable, stream failed to build, or stream halted at runtime
    #[error("Audio backend error: {0}")]
    AudioBackend(String),

    /// The host has no default device of the requested direction
    #[error("No default {0} device available")]
    NoDevice(&'static str),

    /// No device with the requested name
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),
}

/// Result type for engine operations
pub type LooperResult<T> = Result<T, LooperError>;
