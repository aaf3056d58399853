//! Backend client error types

use thiserror::Error;

/// Errors talking to the backend REST API
#[derive(Debug, Error)]
pub enum BackendError {
    /// Token missing, expired or rejected (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entity does not exist (HTTP 404)
    #[error("Not found")]
    NotFound,

    /// Any other non-success status
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection failure or timeout
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// Body did not match the expected shape
    #[error("Invalid backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Message suitable for showing to the person who triggered the call
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(_) => "Your session has expired. Please log in again.".to_string(),
            Self::NotFound => "The requested item no longer exists.".to_string(),
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Status { .. } | Self::Decode(_) => {
                "The server could not process the request.".to_string()
            }
            Self::Transport(_) => "Could not reach the server. Please try again.".to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
