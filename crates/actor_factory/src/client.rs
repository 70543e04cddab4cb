//! CARLA client abstraction
//!
//! Defines the trait every server RPC goes through, supporting the real client
//! and mock testing.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, Location, SensorSource, Transform, VehicleControl, WalkerControl, WeatherParameters,
    WorldId,
};

use crate::error::Result;

/// Server address and request timeout
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Applied to every request; an expired request fails and is not retried
    pub timeout: Duration,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2000,
            timeout: Duration::from_secs_f64(10.0),
        }
    }
}

/// Mesh generation parameters for an OpenDRIVE world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpendriveParams {
    /// Meters between mesh vertices
    pub vertex_distance: f64,
    /// Meters
    pub max_road_length: f64,
    /// Meters
    pub wall_height: f64,
    /// Extra lane width in meters
    pub additional_width: f64,
    pub smooth_junctions: bool,
    pub enable_mesh_visibility: bool,
}

impl Default for OpendriveParams {
    fn default() -> Self {
        Self {
            vertex_distance: 2.0,
            max_road_length: 500.0,
            wall_height: 0.0,
            additional_width: 0.6,
            smooth_junctions: true,
            enable_mesh_visibility: true,
        }
    }
}

/// CARLA client trait
///
/// Abstracts CARLA core operations for testing and future implementation replacement.
/// Every method is a request/response RPC; none of them retries.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(&mut self, endpoint: &Endpoint) -> impl Future<Output = Result<()>> + Send;

    /// Episode ID of the currently loaded world
    fn world_id(&self) -> impl Future<Output = Result<WorldId>> + Send;

    /// Blueprint IDs matching a wildcard filter, e.g. "vehicle.*"
    fn blueprint_ids(&self, filter: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Recommended spawn points of the current map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Spawn vehicle
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - Initial pose
    ///
    /// # Returns
    /// Newly created actor ID, or `SpawnRejected` (e.g. collision at the spawn point)
    fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Enable or disable server-side autopilot
    fn set_autopilot(
        &self,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Random location on the pedestrian navigation mesh
    fn random_navigation_location(&self) -> impl Future<Output = Result<Option<Location>>> + Send;

    /// Whether `location` projects onto a road-network waypoint
    fn has_waypoint(&self, location: Location) -> impl Future<Output = Result<bool>> + Send;

    /// Spawn without failing on placement conflicts
    ///
    /// Returns `Ok(None)` when the server refuses the placement.
    fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> impl Future<Output = Result<Option<ActorId>>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.camera.rgb"
    /// * `transform` - Pose relative to parent actor
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Sensor attributes
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    fn apply_vehicle_control(
        &self,
        actor_id: ActorId,
        control: VehicleControl,
    ) -> impl Future<Output = Result<()>> + Send;

    fn apply_walker_control(
        &self,
        actor_id: ActorId,
        control: WalkerControl,
    ) -> impl Future<Output = Result<()>> + Send;

    fn set_weather(&self, weather: &WeatherParameters) -> impl Future<Output = Result<()>> + Send;

    /// Reload the world with another map
    ///
    /// Blocking on the server side; every previously returned actor handle is invalid afterwards.
    fn load_world(&self, map: &str) -> impl Future<Output = Result<WorldId>> + Send;

    /// Build a world from an OpenDRIVE document (forwarded verbatim)
    fn generate_opendrive_world(
        &self,
        opendrive: &str,
        params: &OpendriveParams,
    ) -> impl Future<Output = Result<WorldId>> + Send;

    fn set_spectator_transform(
        &self,
        transform: Transform,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current world pose of an actor
    fn actor_transform(&self, actor_id: ActorId) -> impl Future<Output = Result<Transform>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Get the data source of a sensor actor
    ///
    /// # Returns
    /// Boxed trait object implementing `SensorSource`, None if the actor is not a live sensor
    fn sensor_source(&self, actor_id: ActorId, sensor_id: String) -> Option<Box<dyn SensorSource>>;
}

/// Shell-style wildcard match (`*` only), as used by blueprint filters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
