//! ActorFactory 核心实现
//!
//! Spawn vehicles / pedestrians / cameras，管理生命周期与回滚。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use contracts::{
    ActorId, ActorKind, Catalog, Location, SessionRegistry, Transform, Vector3, WalkerControl,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};
use crate::resolver::{self, PEDESTRIAN_FILTER, VEHICLE_FILTER};

/// Camera blueprint attached to every vehicle
pub const CAMERA_BLUEPRINT: &str = "sensor.camera.rgb";

/// Camera offset relative to the vehicle (behind and above)
pub const CAMERA_OFFSET: Location = Location::new(-5.5, 0.0, 2.5);

pub const CAMERA_WIDTH: u32 = 800;
pub const CAMERA_HEIGHT: u32 = 600;

/// Default number of placement attempts for a pedestrian
pub const PEDESTRIAN_MAX_ATTEMPTS: usize = 10;

/// A vehicle created by the factory
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedActor {
    pub actor_id: ActorId,
    pub blueprint: String,
    pub transform: Transform,
}

/// A vehicle and the camera attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedVehicle {
    pub vehicle: SpawnedActor,
    pub camera_id: ActorId,
}

/// Outcome of a teardown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Actors the server confirmed destroyed
    pub destroyed: usize,
    /// Actors whose destroy request failed (logged)
    pub failed: Vec<ActorId>,
}

/// Actor Factory
///
/// 负责 spawn vehicles、pedestrians 和 cameras，
/// 并提供 teardown 和回滚能力。
pub struct ActorFactory<C: CarlaClient> {
    client: Arc<C>,
    catalog: Arc<Catalog>,
    rng: Mutex<StdRng>,
}

impl<C: CarlaClient> ActorFactory<C> {
    /// 创建新的 ActorFactory
    pub fn new(client: Arc<C>, catalog: Arc<Catalog>) -> Self {
        Self {
            client,
            catalog,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// 使用固定种子创建（测试用，随机选择可复现）
    pub fn with_seed(client: Arc<C>, catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            client,
            catalog,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Uniform pick; the lock is released before the caller awaits again
    fn choose<T: Clone>(&self, items: &[T]) -> Option<T> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        items.choose(&mut *rng).cloned()
    }

    /// Resolve a vehicle name to a blueprint ID
    ///
    /// `None` picks uniformly among the server's `vehicle.*` blueprints.
    #[instrument(name = "actor_factory_resolve_blueprint", skip(self))]
    pub async fn resolve_blueprint(&self, name: Option<&str>) -> Result<String> {
        match name {
            Some(name) => resolver::lookup_vehicle(&self.catalog, name),
            None => {
                let ids = self.client.blueprint_ids(VEHICLE_FILTER).await?;
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                resolver::pick_random(&ids, VEHICLE_FILTER, &mut *rng)
            }
        }
    }

    /// Spawn a vehicle with autopilot enabled
    ///
    /// Without a transform a registered spawn point is chosen at random.
    /// A refused spawn is reported, never retried.
    #[instrument(
        name = "actor_factory_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    pub async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> Result<SpawnedActor> {
        let transform = match transform {
            Some(transform) => transform,
            None => {
                let points = self.client.spawn_points().await?;
                self.choose(&points).ok_or(ActorFactoryError::NoSpawnPoints)?
            }
        };

        info!(location = %transform.location, "spawning vehicle");
        let actor_id = self.client.spawn_vehicle(blueprint, transform).await?;
        self.client.set_autopilot(actor_id, true).await?;

        info!(actor_id, "vehicle spawned with autopilot");
        Ok(SpawnedActor {
            actor_id,
            blueprint: blueprint.to_string(),
            transform,
        })
    }

    /// Spawn a walking pedestrian at a random navigable location
    ///
    /// Returns `Ok(None)` when every attempt failed to find a free spot.
    #[instrument(name = "actor_factory_spawn_pedestrian", skip(self))]
    pub async fn spawn_pedestrian(&self, max_attempts: usize) -> Result<Option<ActorId>> {
        if max_attempts == 0 {
            return Ok(None);
        }

        let blueprints = self.client.blueprint_ids(PEDESTRIAN_FILTER).await?;
        if blueprints.is_empty() {
            return Err(ActorFactoryError::EmptyCatalog {
                filter: PEDESTRIAN_FILTER.to_string(),
            });
        }

        for attempt in 1..=max_attempts {
            let Some(location) = self.client.random_navigation_location().await? else {
                continue;
            };
            if !self.client.has_waypoint(location).await? {
                continue;
            }

            let Some(blueprint) = self.choose(&blueprints) else {
                break;
            };
            let transform = Transform::from_location(location);
            if let Some(actor_id) = self.client.try_spawn_actor(&blueprint, transform).await? {
                let control = WalkerControl {
                    direction: Vector3::new(1.0, 0.0, 0.0),
                    speed: 1.0,
                    jump: false,
                };
                self.client.apply_walker_control(actor_id, control).await?;

                info!(actor_id, attempt, %location, "pedestrian spawned");
                return Ok(Some(actor_id));
            }
        }

        warn!(max_attempts, "failed to spawn pedestrian, all attempts exhausted");
        Ok(None)
    }

    /// Attach an RGB camera behind the vehicle
    #[instrument(name = "actor_factory_spawn_camera", skip(self))]
    pub async fn spawn_camera(&self, vehicle_id: ActorId) -> Result<ActorId> {
        let attributes = HashMap::from([
            ("image_size_x".to_string(), CAMERA_WIDTH.to_string()),
            ("image_size_y".to_string(), CAMERA_HEIGHT.to_string()),
        ]);

        let camera_id = self
            .client
            .spawn_sensor(
                CAMERA_BLUEPRINT,
                Transform::from_location(CAMERA_OFFSET),
                vehicle_id,
                &attributes,
            )
            .await?;

        info!(camera_id, "camera attached");
        Ok(camera_id)
    }

    /// Spawn vehicle + camera as one unit
    ///
    /// # 原子性保证
    /// camera 失败时销毁刚创建的 vehicle，再返回错误。
    #[instrument(name = "actor_factory_spawn_vehicle_with_camera", skip(self, transform))]
    pub async fn spawn_vehicle_with_camera(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
    ) -> Result<SpawnedVehicle> {
        let vehicle = self.spawn_vehicle(blueprint, transform).await?;

        match self.spawn_camera(vehicle.actor_id).await {
            Ok(camera_id) => Ok(SpawnedVehicle { vehicle, camera_id }),
            Err(e) => {
                warn!(
                    vehicle_id = vehicle.actor_id,
                    error = %e,
                    "camera spawn failed, rolling back vehicle"
                );
                self.destroy_actor_safe(vehicle.actor_id, ActorKind::Vehicle)
                    .await;
                Err(e)
            }
        }
    }

    /// 销毁 registry 中的所有 actors
    ///
    /// # 幂等性
    /// Registry 被清空，多次调用安全；单个失败不会中断 teardown。
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, registry),
        fields(actor_count = registry.actor_count())
    )]
    pub async fn teardown(&self, registry: &mut SessionRegistry) -> TeardownReport {
        info!("starting teardown");

        let mut report = TeardownReport::default();
        for actor in registry.drain() {
            if self.destroy_actor_safe(actor.actor_id, actor.kind).await {
                report.destroyed += 1;
            } else {
                report.failed.push(actor.actor_id);
            }
        }

        info!(
            destroyed = report.destroyed,
            failed = report.failed.len(),
            "teardown completed"
        );
        report
    }

    /// 安全销毁 actor（忽略错误，仅记录日志）
    ///
    /// 服务器上已不存在的 actor（例如地图重载后）不再发起 destroy。
    #[instrument(
        name = "actor_factory_destroy_actor",
        skip(self, kind),
        fields(actor_id, kind = kind.as_str())
    )]
    pub async fn destroy_actor_safe(&self, actor_id: ActorId, kind: ActorKind) -> bool {
        match self.client.actor_exists(actor_id).await {
            Ok(false) => {
                debug!(actor_id, "actor already gone");
                return true;
            }
            Ok(true) => {}
            Err(e) => debug!(actor_id, error = %e, "existence check failed, destroying anyway"),
        }

        info!(actor_id, "destroying actor");
        match self.client.destroy_actor(actor_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(actor_id, error = %e, "failed to destroy actor");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Endpoint;
    use crate::mock_client::{MockCarlaClient, MockConfig};
    use contracts::VehicleCatalogEntry;

    fn test_catalog() -> Arc<Catalog> {
        Arc::new(Catalog {
            maps: vec!["Town01".to_string(), "Town02".to_string()],
            vehicles: vec![VehicleCatalogEntry {
                display_name: "tesla model3".to_string(),
                blueprint_id: "vehicle.tesla.model3".to_string(),
            }],
            weather: vec![],
        })
    }

    async fn factory_with(config: MockConfig) -> ActorFactory<MockCarlaClient> {
        let mut client = MockCarlaClient::with_config(config);
        client.connect(&Endpoint::default()).await.unwrap();
        ActorFactory::with_seed(Arc::new(client), test_catalog(), 42)
    }

    #[tokio::test]
    async fn test_resolve_named_and_random() {
        let factory = factory_with(MockConfig::default()).await;

        let named = factory.resolve_blueprint(Some("TESLA MODEL3")).await.unwrap();
        assert_eq!(named, "vehicle.tesla.model3");

        let random = factory.resolve_blueprint(None).await.unwrap();
        assert!(random.starts_with("vehicle."));

        let err = factory.resolve_blueprint(Some("hovercraft")).await.unwrap_err();
        assert!(matches!(err, ActorFactoryError::UnknownVehicleName { .. }));
    }

    #[tokio::test]
    async fn test_resolve_random_empty_library() {
        let factory = factory_with(MockConfig {
            blueprints: vec!["walker.pedestrian.0001".to_string()],
            ..Default::default()
        })
        .await;

        let err = factory.resolve_blueprint(None).await.unwrap_err();
        assert!(matches!(err, ActorFactoryError::EmptyCatalog { .. }));
    }

    #[tokio::test]
    async fn test_spawn_vehicle_enables_autopilot() {
        let factory = factory_with(MockConfig::default()).await;

        let spawned = factory
            .spawn_vehicle("vehicle.audi.tt", None)
            .await
            .unwrap();

        let actor = factory.client().actor(spawned.actor_id).unwrap();
        assert!(actor.autopilot);
        assert!(MockConfig::default()
            .spawn_points
            .contains(&spawned.transform));
    }

    #[tokio::test]
    async fn test_spawn_vehicle_no_spawn_points() {
        let factory = factory_with(MockConfig {
            spawn_points: vec![],
            ..Default::default()
        })
        .await;

        let err = factory
            .spawn_vehicle("vehicle.audi.tt", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ActorFactoryError::NoSpawnPoints));
        assert_eq!(factory.client().spawn_requests(), 0);
    }

    #[tokio::test]
    async fn test_spawn_rejected_not_retried() {
        let factory = factory_with(MockConfig {
            reject_blueprints: vec!["vehicle.audi.tt".to_string()],
            ..Default::default()
        })
        .await;

        let err = factory
            .spawn_vehicle("vehicle.audi.tt", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ActorFactoryError::SpawnRejected { .. }));
        assert_eq!(factory.client().spawn_requests(), 1);
        assert_eq!(factory.client().actor_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_pedestrian_zero_attempts() {
        let factory = factory_with(MockConfig::default()).await;

        let result = factory.spawn_pedestrian(0).await.unwrap();
        assert!(result.is_none());
        assert_eq!(factory.client().spawn_requests(), 0);
    }

    #[tokio::test]
    async fn test_spawn_pedestrian_walks_forward() {
        let factory = factory_with(MockConfig {
            off_road_locations: 1,
            occupied_walker_spawns: 1,
            ..Default::default()
        })
        .await;

        let actor_id = factory
            .spawn_pedestrian(PEDESTRIAN_MAX_ATTEMPTS)
            .await
            .unwrap()
            .expect("pedestrian should spawn");

        // 第一次无 waypoint，第二次被占用，第三次成功
        assert_eq!(factory.client().spawn_requests(), 2);
        let controls = factory.client().walker_controls();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].0, actor_id);
        assert_eq!(controls[0].1.direction, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(controls[0].1.speed, 1.0);
    }

    #[tokio::test]
    async fn test_spawn_pedestrian_exhausted() {
        let factory = factory_with(MockConfig {
            occupied_walker_spawns: usize::MAX,
            ..Default::default()
        })
        .await;

        let result = factory.spawn_pedestrian(3).await.unwrap();
        assert!(result.is_none());
        assert_eq!(factory.client().spawn_requests(), 3);
        assert_eq!(factory.client().actor_count(), 0);
    }

    #[tokio::test]
    async fn test_camera_attached_behind_vehicle() {
        let factory = factory_with(MockConfig::default()).await;

        let spawned = factory
            .spawn_vehicle_with_camera("vehicle.tesla.model3", None)
            .await
            .unwrap();

        let camera = factory.client().actor(spawned.camera_id).unwrap();
        assert_eq!(camera.blueprint, CAMERA_BLUEPRINT);
        assert_eq!(camera.parent, Some(spawned.vehicle.actor_id));
        assert_eq!(camera.transform.location, Location::new(-5.5, 0.0, 2.5));
    }

    #[tokio::test]
    async fn test_camera_failure_rolls_back_vehicle() {
        let factory = factory_with(MockConfig {
            fail_sensors: true,
            ..Default::default()
        })
        .await;

        let err = factory
            .spawn_vehicle_with_camera("vehicle.tesla.model3", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ActorFactoryError::SensorSpawnFailed { .. }));
        assert_eq!(factory.client().actor_count(), 0);
    }

    #[tokio::test]
    async fn test_camera_invalid_parent() {
        let factory = factory_with(MockConfig::default()).await;
        let err = factory.spawn_camera(9999).await.unwrap_err();
        assert!(matches!(err, ActorFactoryError::SensorSpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_teardown_idempotent() {
        let factory = factory_with(MockConfig::default()).await;
        let mut registry = SessionRegistry::new();

        let spawned = factory
            .spawn_vehicle_with_camera("vehicle.tesla.model3", None)
            .await
            .unwrap();
        registry.register_vehicle(
            spawned.vehicle.actor_id,
            spawned.vehicle.blueprint,
            spawned.camera_id,
        );
        let walker = factory.spawn_pedestrian(10).await.unwrap().unwrap();
        registry.register_pedestrian(walker);

        // First teardown
        let report = factory.teardown(&mut registry).await;
        assert_eq!(report.destroyed, 3);
        assert!(registry.is_empty());
        assert_eq!(factory.client().actor_count(), 0);

        // Second teardown should also succeed
        let report = factory.teardown(&mut registry).await;
        assert_eq!(report, TeardownReport::default());
    }

    #[tokio::test]
    async fn test_teardown_continues_after_failure() {
        let factory = factory_with(MockConfig {
            // 1000 is the first allocated id: the vehicle
            fail_destroy: vec![1000],
            ..Default::default()
        })
        .await;
        let mut registry = SessionRegistry::new();

        let spawned = factory
            .spawn_vehicle_with_camera("vehicle.tesla.model3", None)
            .await
            .unwrap();
        registry.register_vehicle(spawned.vehicle.actor_id, "vehicle.tesla.model3", spawned.camera_id);

        let report = factory.teardown(&mut registry).await;
        assert_eq!(report.destroyed, 1);
        assert_eq!(report.failed, vec![1000]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_skips_actors_gone_from_server() {
        let factory = factory_with(MockConfig {
            // would fail if a destroy were actually issued
            fail_destroy: vec![1000],
            ..Default::default()
        })
        .await;
        let mut registry = SessionRegistry::new();

        let spawned = factory
            .spawn_vehicle_with_camera("vehicle.tesla.model3", None)
            .await
            .unwrap();
        registry.register_vehicle(spawned.vehicle.actor_id, "vehicle.tesla.model3", spawned.camera_id);
        factory.client().load_world("Town02").await.unwrap();

        let report = factory.teardown(&mut registry).await;
        assert_eq!(report.destroyed, 2);
        assert!(report.failed.is_empty());
    }
}
