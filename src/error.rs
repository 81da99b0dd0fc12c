// src/error.rs

//! Error types for talking to the reporting endpoints.

use thiserror::Error;

/// Failures observed while reading status or posting an action.
///
/// A remote job that ran and failed is *not* an error here; it arrives as
/// data in [`crate::sync::status::SetupStatus::error_message`].
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The request could not be sent, timed out, or came back non-success.
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// The status payload could not be understood.
    #[error("could not parse status payload: {0}")]
    Parse(String),
}

impl TrackerError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        TrackerError::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Parse(e.to_string())
    }
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
