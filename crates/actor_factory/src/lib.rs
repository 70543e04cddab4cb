//! # Actor Factory
//!
//! CARLA client side of the session.
//!
//! Responsibilities:
//! - `CarlaClient` trait through which every server RPC passes
//! - Blueprint resolution (catalog name or random pick)
//! - Spawn vehicles, pedestrians and attached cameras, with rollback and teardown
//! - Weather / map changes and OpenDRIVE world generation
//! - Mock client and camera for tests and the offline backend
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod capture;
pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;
pub mod resolver;
pub mod world;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use capture::capture_frame;
pub use client::{wildcard_match, CarlaClient, Endpoint, OpendriveParams};
pub use contracts::{ActorId, SensorSource, SessionRegistry};
pub use error::{ActorFactoryError, Result};
pub use factory::{
    ActorFactory, SpawnedActor, SpawnedVehicle, TeardownReport, CAMERA_BLUEPRINT, CAMERA_HEIGHT,
    CAMERA_OFFSET, CAMERA_WIDTH, PEDESTRIAN_MAX_ATTEMPTS,
};
pub use mock_client::{MockActor, MockCarlaClient, MockConfig};
pub use mock_sensor::{MockSensor, MockSensorConfig};
pub use resolver::{PEDESTRIAN_FILTER, VEHICLE_FILTER};
pub use world::{MapChange, PropGrid, WorldMutator, GROUND_PROP_BLUEPRINT, GROUND_PROP_SPACING};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
