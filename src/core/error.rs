// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tfgen Core Error Types
//!
//! Error handling for pipeline construction, ingestion and retrieval.

use thiserror::Error;

/// Result type for tfgen operations
pub type TfgenResult<T> = Result<T, TfgenError>;

/// Errors surfaced by the transition pipeline and its components
#[derive(Error, Debug)]
pub enum TfgenError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        parameter: Option<String>,
    },

    #[error("Not ready: {message}")]
    NotReady { message: String },

    #[error("Operation '{operation}' is not available in '{active}' ingestion mode")]
    IncompatibleMode { operation: String, active: String },

    #[error("Engine stopped: {message}")]
    EngineStopped { message: String },

    #[error("Send failed: {message}")]
    SendError { message: String },

    #[error("Log parse error: {message}")]
    Parse { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Custom error creation helpers
impl TfgenError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            parameter: None,
        }
    }

    /// Create a configuration error tied to a specific parameter
    pub fn configuration_with_parameter(
        message: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Create a not-ready error (output requested before any snapshot exists)
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Create an incompatible-mode error
    pub fn incompatible_mode(operation: impl Into<String>, active: impl Into<String>) -> Self {
        Self::IncompatibleMode {
            operation: operation.into(),
            active: active.into(),
        }
    }

    /// Create an engine-stopped error
    pub fn engine_stopped(message: impl Into<String>) -> Self {
        Self::EngineStopped {
            message: message.into(),
        }
    }

    /// Create a send error
    pub fn send_error(message: impl Into<String>) -> Self {
        Self::SendError {
            message: message.into(),
        }
    }

    /// Create a log parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
