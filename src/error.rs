//! Error types for the pith resolution and transformation pipeline.
//!
//! Each enum corresponds to one failure tier. Configuration- and
//! capability-tier errors are absorbed by the resolver and degrade to
//! pass-through output; invocation- and programmer-tier errors surface.

use std::time::Duration;
use thiserror::Error;

/// Configuration-tier errors raised by profile lookup
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),
}

/// Construction-tier errors raised by the transform factory
#[derive(Debug, Error)]
pub enum TransformError {
    /// The backend implementation for the profile could not be constructed.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend was constructed but the configured server or model did
    /// not answer the availability probe.
    #[error("Backend connection failed: {0}")]
    BackendConnection(String),

    /// No backend constructor is registered for the profile kind. Indicates
    /// a missing implementation mapping, not a runtime condition.
    #[error("No transformer registered for profile kind: {0}")]
    UnregisteredKind(String),
}

impl TransformError {
    /// Whether this failure is eligible for silent fallback to the identity
    /// transformer. `UnregisteredKind` never is.
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            TransformError::BackendUnavailable(_) | TransformError::BackendConnection(_)
        )
    }
}

/// Invocation-tier errors raised by a backend call after a transformer was
/// already selected
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend request failed: {0}")]
    RequestFailed(String),

    #[error("Model not found on backend: {0}")]
    ModelNotFound(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Errors raised when spawning the child command
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Empty command line")]
    EmptyCommand,
}

/// Errors raised while setting up the ambient stack
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid log format: {0} (must be 'json' or 'text')")]
    InvalidLogFormat(String),

    #[error("Invalid log directive: {0}")]
    InvalidLogDirective(String),
}
