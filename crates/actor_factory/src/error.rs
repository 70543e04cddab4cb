//! Actor Factory error types

use contracts::ActorId;
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error (fatal for a session)
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// The server did not answer within the client timeout
    #[error("request '{operation}' timed out after {timeout_secs:.1}s")]
    RequestTimeout { operation: String, timeout_secs: f64 },

    /// Name not present in the vehicle catalog
    #[error("unknown vehicle name '{name}'")]
    UnknownVehicleName { name: String },

    /// Blueprint filter matched nothing
    #[error("no blueprints match '{filter}'")]
    EmptyCatalog { filter: String },

    /// Map has no registered spawn points
    #[error("current map has no spawn points")]
    NoSpawnPoints,

    /// Vehicle spawn refused by the server
    #[error("failed to spawn '{blueprint}': {message}")]
    SpawnRejected { blueprint: String, message: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{blueprint}' on actor {parent_id}: {message}")]
    SensorSpawnFailed {
        blueprint: String,
        parent_id: ActorId,
        message: String,
    },

    /// Handle does not refer to a live actor
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Weather name not in the catalog
    #[error("weather type '{name}' not recognized")]
    UnrecognizedWeather { name: String },

    /// Map name not in the catalog
    #[error("map name '{name}' not recognized")]
    UnrecognizedMap { name: String },

    /// No frame arrived in time
    #[error("no frame from sensor {actor_id} within {timeout_ms}ms")]
    FrameTimeout { actor_id: ActorId, timeout_ms: u64 },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// World generation error
    #[error("failed to generate world: {message}")]
    WorldGeneration { message: String },
}

impl ActorFactoryError {
    /// Create spawn rejection error
    pub fn spawn_rejected(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnRejected {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create sensor spawn error
    pub fn sensor_spawn(
        blueprint: impl Into<String>,
        parent_id: ActorId,
        message: impl Into<String>,
    ) -> Self {
        Self::SensorSpawnFailed {
            blueprint: blueprint.into(),
            parent_id,
            message: message.into(),
        }
    }

    /// Create connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Whether the error means the server link itself is broken
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
