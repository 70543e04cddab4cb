//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use carla::client::{Actor, ActorBase, Client, Sensor, Vehicle, Walker, World};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use carla::rpc::{
    OpendriveGenerationParameters, VehicleControl as CarlaVehicleControl,
    WalkerControl as CarlaWalkerControl, WeatherParameters as CarlaWeather,
};
use contracts::{
    ActorId, Location, Rotation, SensorSource, Transform, VehicleControl, WalkerControl,
    WeatherParameters, WorldId,
};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::{CarlaClient, Endpoint, OpendriveParams};
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements CarlaClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    /// CARLA client
    client: Arc<Mutex<Option<Client>>>,
    /// World reference (replaced on every reload)
    world: Arc<Mutex<Option<World>>>,
    /// Actors created by this client, keyed by server ID
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
}

/// Actor type enumeration
#[derive(Clone)]
enum ActorType {
    Vehicle(Vehicle),
    Walker(Walker),
    Sensor(Sensor),
    Other(Actor),
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    fn not_connected() -> ActorFactoryError {
        ActorFactoryError::connection("not connected to CARLA server")
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = self.world.lock().map_err(|_| Self::not_connected())?;
        let world = world_guard.as_mut().ok_or_else(Self::not_connected)?;
        f(world)
    }

    fn with_client_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Client) -> Result<R>,
    {
        let mut client_guard = self.client.lock().map_err(|_| Self::not_connected())?;
        let client = client_guard.as_mut().ok_or_else(Self::not_connected)?;
        f(client)
    }

    /// Swap in a freshly loaded world; every stored handle belonged to the old one
    fn replace_world(&self, world: World) -> WorldId {
        let world_id = world.id();
        if let Ok(mut actors) = self.actors.lock() {
            actors.clear();
        }
        if let Ok(mut guard) = self.world.lock() {
            *guard = Some(world);
        }
        world_id
    }

    /// Save actor to registry for teardown
    fn store_actor(&self, actor_id: ActorId, actor: ActorType) {
        if let Ok(mut actors) = self.actors.lock() {
            actors.insert(actor_id, actor);
        }
    }

    fn stored(&self, actor_id: ActorId) -> Result<ActorType> {
        self.actors
            .lock()
            .ok()
            .and_then(|actors| actors.get(&actor_id).cloned())
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    fn classify(actor: Actor) -> ActorType {
        if let Ok(vehicle) = Vehicle::try_from(actor.clone()) {
            return ActorType::Vehicle(vehicle);
        }
        if let Ok(walker) = Walker::try_from(actor.clone()) {
            return ActorType::Walker(walker);
        }
        ActorType::Other(actor)
    }

    /// Convert internal Transform to CARLA Transform
    fn to_carla_transform(transform: Transform) -> CarlaTransform {
        CarlaTransform {
            location: Self::to_carla_location(transform.location),
            rotation: CarlaRotation {
                pitch: transform.rotation.pitch as f32,
                yaw: transform.rotation.yaw as f32,
                roll: transform.rotation.roll as f32,
            },
        }
    }

    fn to_carla_location(location: Location) -> CarlaLocation {
        CarlaLocation {
            x: location.x as f32,
            y: location.y as f32,
            z: location.z as f32,
        }
    }

    fn from_carla_transform(transform: &CarlaTransform) -> Transform {
        Transform {
            location: Self::from_carla_location(&transform.location),
            rotation: Rotation {
                pitch: transform.rotation.pitch as f64,
                yaw: transform.rotation.yaw as f64,
                roll: transform.rotation.roll as f64,
            },
        }
    }

    fn from_carla_location(location: &CarlaLocation) -> Location {
        Location::new(location.x as f64, location.y as f64, location.z as f64)
    }

    fn to_carla_weather(weather: &WeatherParameters) -> CarlaWeather {
        CarlaWeather {
            cloudiness: weather.cloudiness,
            precipitation: weather.precipitation,
            precipitation_deposits: weather.precipitation_deposits,
            wind_intensity: weather.wind_intensity,
            sun_azimuth_angle: weather.sun_azimuth_angle,
            sun_altitude_angle: weather.sun_altitude_angle,
            fog_density: weather.fog_density,
            fog_distance: weather.fog_distance,
            fog_falloff: weather.fog_falloff,
            wetness: weather.wetness,
            ..Default::default()
        }
    }

    fn destroy_stored(actor: ActorType, actor_id: ActorId) {
        let destroyed = match actor {
            ActorType::Sensor(sensor) => {
                if sensor.is_listening() {
                    sensor.stop();
                }
                sensor.destroy()
            }
            ActorType::Vehicle(vehicle) => vehicle.destroy(),
            ActorType::Walker(walker) => walker.destroy(),
            ActorType::Other(actor) => actor.destroy(),
        };
        if !destroyed {
            warn!(actor_id, "destroy actor returned false");
        }
    }
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self, endpoint), fields(host = %endpoint.host, port = endpoint.port))]
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        let mut client = Client::connect(&endpoint.host, endpoint.port, None);
        client.set_timeout(endpoint.timeout);
        let world = client.world();

        info!(
            map = %world.map().name(),
            "connected to CARLA server"
        );

        *self.client.lock().map_err(|_| Self::not_connected())? = Some(client);
        *self.world.lock().map_err(|_| Self::not_connected())? = Some(world);

        Ok(())
    }

    async fn world_id(&self) -> Result<WorldId> {
        self.with_world_mut(|world| Ok(world.id()))
    }

    async fn blueprint_ids(&self, filter: &str) -> Result<Vec<String>> {
        self.with_world_mut(|world| {
            Ok(world
                .blueprint_library()
                .filter(filter)
                .iter()
                .map(|bp| bp.id().to_string())
                .collect())
        })
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(Self::from_carla_transform)
                .collect())
        })
    }

    #[instrument(
        name = "real_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(&self, blueprint: &str, transform: Transform) -> Result<ActorId> {
        let vehicle = self.with_world_mut(|world| {
            let vehicle_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::spawn_rejected(blueprint, format!("blueprint '{blueprint}' not found"))
            })?;
            let actor = world
                .spawn_actor(&vehicle_bp, &Self::to_carla_transform(transform))
                .map_err(|e| ActorFactoryError::spawn_rejected(blueprint, e.to_string()))?;
            Vehicle::try_from(actor).map_err(|_| {
                ActorFactoryError::spawn_rejected(blueprint, "spawned actor is not a vehicle")
            })
        })?;

        let actor_id = vehicle.id();
        debug!(actor_id, blueprint, "vehicle spawned");
        self.store_actor(actor_id, ActorType::Vehicle(vehicle));
        Ok(actor_id)
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        match self.stored(actor_id)? {
            ActorType::Vehicle(vehicle) => {
                vehicle.set_autopilot(enabled);
                info!(actor_id, enabled, "autopilot updated");
                Ok(())
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        self.with_world_mut(|world| {
            Ok(world
                .random_location_from_navigation()
                .map(|location| Self::from_carla_location(&location)))
        })
    }

    async fn has_waypoint(&self, location: Location) -> Result<bool> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .waypoint(&Self::to_carla_location(location))
                .is_some())
        })
    }

    #[instrument(name = "real_carla_try_spawn", skip(self, transform), fields(blueprint = %blueprint))]
    async fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> Result<Option<ActorId>> {
        let actor = self.with_world_mut(|world| {
            let Some(bp) = world.blueprint_library().find(blueprint) else {
                warn!(blueprint, "blueprint not found");
                return Ok(None);
            };
            Ok(world
                .spawn_actor(&bp, &Self::to_carla_transform(transform))
                .ok())
        })?;

        Ok(actor.map(|actor| {
            let actor_id = actor.id();
            self.store_actor(actor_id, Self::classify(actor));
            actor_id
        }))
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        let parent = match self.stored(parent_id) {
            Ok(ActorType::Vehicle(vehicle)) => vehicle,
            _ => {
                return Err(ActorFactoryError::sensor_spawn(
                    blueprint,
                    parent_id,
                    "parent vehicle not found",
                ))
            }
        };

        let sensor = self.with_world_mut(|world| {
            let mut sensor_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::sensor_spawn(
                    blueprint,
                    parent_id,
                    format!("blueprint '{blueprint}' not found"),
                )
            })?;

            for (key, value) in attributes {
                if !sensor_bp.set_attribute(key, value) {
                    warn!(key, value, "failed to set sensor attribute");
                }
            }

            let actor = world
                .spawn_actor_attached(&sensor_bp, &Self::to_carla_transform(transform), &parent, None)
                .map_err(|e| ActorFactoryError::sensor_spawn(blueprint, parent_id, e.to_string()))?;
            Sensor::try_from(actor).map_err(|_| {
                ActorFactoryError::sensor_spawn(blueprint, parent_id, "spawned actor is not a sensor")
            })
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, blueprint, parent_id, "sensor spawned and attached");
        self.store_actor(actor_id, ActorType::Sensor(sensor));
        Ok(actor_id)
    }

    async fn apply_vehicle_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        match self.stored(actor_id)? {
            ActorType::Vehicle(vehicle) => {
                vehicle.apply_control(&CarlaVehicleControl {
                    throttle: control.throttle,
                    steer: control.steer,
                    brake: control.brake,
                    hand_brake: control.hand_brake,
                    reverse: control.reverse,
                    ..Default::default()
                });
                Ok(())
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    async fn apply_walker_control(&self, actor_id: ActorId, control: WalkerControl) -> Result<()> {
        match self.stored(actor_id)? {
            ActorType::Walker(walker) => {
                walker.apply_control(&CarlaWalkerControl {
                    direction: carla::geom::Vector3D {
                        x: control.direction.x as f32,
                        y: control.direction.y as f32,
                        z: control.direction.z as f32,
                    },
                    speed: control.speed,
                    jump: control.jump,
                });
                Ok(())
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    async fn set_weather(&self, weather: &WeatherParameters) -> Result<()> {
        self.with_world_mut(|world| {
            world.set_weather(&Self::to_carla_weather(weather));
            Ok(())
        })
    }

    #[instrument(name = "real_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<WorldId> {
        let world = self.with_client_mut(|client| Ok(client.load_world(map)))?;
        let world_id = self.replace_world(world);
        info!(world_id, "world reloaded");
        Ok(world_id)
    }

    #[instrument(name = "real_carla_generate_world", skip(self, opendrive, params), fields(len = opendrive.len()))]
    async fn generate_opendrive_world(
        &self,
        opendrive: &str,
        params: &OpendriveParams,
    ) -> Result<WorldId> {
        let params = OpendriveGenerationParameters {
            vertex_distance: params.vertex_distance,
            max_road_length: params.max_road_length,
            wall_height: params.wall_height,
            additional_width: params.additional_width,
            smooth_junctions: params.smooth_junctions,
            enable_mesh_visibility: params.enable_mesh_visibility,
            ..Default::default()
        };
        let world = self.with_client_mut(|client| {
            client
                .generate_opendrive_world(opendrive, &params)
                .map_err(|e| ActorFactoryError::WorldGeneration {
                    message: e.to_string(),
                })
        })?;
        Ok(self.replace_world(world))
    }

    async fn set_spectator_transform(&self, transform: Transform) -> Result<()> {
        self.with_world_mut(|world| {
            world
                .spectator()
                .set_transform(&Self::to_carla_transform(transform));
            Ok(())
        })
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        let transform = match self.stored(actor_id)? {
            ActorType::Vehicle(actor) => actor.transform(),
            ActorType::Walker(actor) => actor.transform(),
            ActorType::Sensor(actor) => actor.transform(),
            ActorType::Other(actor) => actor.transform(),
        };
        Ok(Self::from_carla_transform(&transform))
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = self
            .actors
            .lock()
            .map_err(|_| Self::not_connected())?
            .remove(&actor_id);

        if let Some(actor) = removed {
            Self::destroy_stored(actor, actor_id);
            debug!(actor_id, "actor destroyed");
        }

        // Idempotent: return Ok even if not exists
        Ok(())
    }

    #[instrument(name = "real_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.stored(actor_id).is_ok())
    }

    fn sensor_source(&self, actor_id: ActorId, sensor_id: String) -> Option<Box<dyn SensorSource>> {
        match self.stored(actor_id).ok()? {
            ActorType::Sensor(sensor) => Some(Box::new(CarlaSensorSource::new(sensor_id, sensor))),
            _ => None,
        }
    }
}
