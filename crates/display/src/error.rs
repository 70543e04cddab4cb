//! Display error types

use thiserror::Error;

/// Display specific error
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Payload is not a camera image (reported, not fatal)
    #[error("unsupported frame type '{kind}'")]
    UnsupportedFrameType { kind: &'static str },

    /// Byte length does not match the declared dimensions
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// Window could not be created
    #[error("failed to create window: {message}")]
    WindowCreation { message: String },

    /// Presenting to an open surface failed
    #[error("display surface error: {message}")]
    Surface { message: String },

    /// Window closed or display worker gone
    #[error("display is closed")]
    Closed,
}

impl DisplayError {
    pub fn window(message: impl Into<String>) -> Self {
        Self::WindowCreation {
            message: message.into(),
        }
    }

    pub fn surface(message: impl Into<String>) -> Self {
        Self::Surface {
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DisplayError>;
