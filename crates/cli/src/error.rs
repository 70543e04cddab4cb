//! Error types for the interactive session.

use actor_factory::ActorFactoryError;
use display::DisplayError;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Non-numeric or out-of-range selection
    #[error("invalid index '{input}' (expected 0..{count})")]
    InvalidIndex { input: String, count: usize },

    /// Nothing to select from
    #[error("no vehicles spawned yet")]
    NoVehicles,

    #[error(transparent)]
    Actor(#[from] ActorFactoryError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    /// Terminal IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn invalid_index(input: impl Into<String>, count: usize) -> Self {
        Self::InvalidIndex {
            input: input.into(),
            count,
        }
    }

    /// Whether the menu loop must stop
    ///
    /// A broken server link or terminal ends the session; everything else,
    /// a timed out request included, is reported and the menu is shown again.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Actor(e) => e.is_connection_fault(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
