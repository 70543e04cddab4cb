//! Mock CARLA 客户端
//!
//! 用于单元测试和离线演示的 mock 实现，支持注入失败场景。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use contracts::{
    ActorId, ActorKind, Location, Rotation, SensorSource, Transform, VehicleControl,
    WalkerControl, WeatherParameters, WorldId,
};
use tracing::instrument;

use crate::client::{wildcard_match, CarlaClient, Endpoint, OpendriveParams};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{MockSensor, MockSensorConfig};

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 服务器上的蓝图库
    pub blueprints: Vec<String>,
    /// 地图推荐的出生点
    pub spawn_points: Vec<Transform>,
    /// 导航网格上的随机位置（循环使用）
    pub navigation_locations: Vec<Location>,
    /// 前 N 个导航位置没有 waypoint
    pub off_road_locations: usize,
    /// 前 N 次 walker try_spawn 因占用返回 None
    pub occupied_walker_spawns: usize,
    /// 应该被拒绝的 vehicle 蓝图
    pub reject_blueprints: Vec<String>,
    /// sensor spawn 是否失败
    pub fail_sensors: bool,
    /// 应该失败的 destroy actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 成功 N 次 spawn 请求后连接断开（仅影响下一次 spawn）
    pub drop_connection_after_spawns: Option<usize>,
    /// 第 N 次（从 0 计）spawn 请求超时，连接保持
    pub timeout_on_spawn: Option<usize>,
    /// 初始地图
    pub initial_map: String,
    /// Mock 相机参数
    pub camera: MockSensorConfig,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            blueprints: [
                "vehicle.tesla.model3",
                "vehicle.audi.tt",
                "vehicle.dodge.charger_2020",
                "vehicle.mini.cooper_s_2021",
                "walker.pedestrian.0001",
                "walker.pedestrian.0002",
                "sensor.camera.rgb",
                "static.prop.streetbarrier",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            spawn_points: (0..4)
                .map(|i| Transform {
                    location: Location::new(10.0 * i as f64, 0.0, 0.5),
                    rotation: Rotation {
                        pitch: 0.0,
                        yaw: 90.0,
                        roll: 0.0,
                    },
                })
                .collect(),
            navigation_locations: vec![
                Location::new(1.0, 2.0, 0.0),
                Location::new(3.0, 4.0, 0.0),
                Location::new(5.0, 6.0, 0.0),
            ],
            off_road_locations: 0,
            occupied_walker_spawns: 0,
            reject_blueprints: vec![],
            fail_sensors: false,
            fail_destroy: vec![],
            drop_connection_after_spawns: None,
            timeout_on_spawn: None,
            initial_map: "Town10HD".to_string(),
            camera: MockSensorConfig::default(),
        }
    }
}

/// 服务器端 actor 状态
#[derive(Debug, Clone)]
pub struct MockActor {
    pub blueprint: String,
    pub kind: ActorKind,
    pub transform: Transform,
    pub parent: Option<ActorId>,
    pub autopilot: bool,
}

/// 可观察的调用记录
#[derive(Debug, Default)]
struct MockState {
    actors: HashMap<ActorId, MockActor>,
    connected: bool,
    world_id: WorldId,
    map: String,
    spawn_requests: usize,
    navigation_picks: usize,
    walker_attempts: usize,
    weather_history: Vec<WeatherParameters>,
    map_loads: Vec<String>,
    vehicle_controls: Vec<(ActorId, VehicleControl)>,
    walker_controls: Vec<(ActorId, WalkerControl)>,
    spectator: Option<Transform>,
    generated_worlds: Vec<String>,
}

/// Mock CARLA 客户端
pub struct MockCarlaClient {
    config: MockConfig,
    /// Actor ID 计数器
    next_actor_id: AtomicU32,
    state: Mutex<MockState>,
}

impl MockCarlaClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        let state = MockState {
            world_id: 1,
            map: config.initial_map.clone(),
            ..Default::default()
        };
        Self {
            config,
            next_actor_id: AtomicU32::new(1000), // 从 1000 开始，便于识别
            state: Mutex::new(state),
        }
    }

    /// 获取当前存活的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.state.lock().unwrap().actors.len()
    }

    /// 获取某类 actor 数量
    pub fn actor_count_of(&self, kind: ActorKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .actors
            .values()
            .filter(|actor| actor.kind == kind)
            .count()
    }

    /// 获取 actor 快照
    pub fn actor(&self, actor_id: ActorId) -> Option<MockActor> {
        self.state.lock().unwrap().actors.get(&actor_id).cloned()
    }

    /// spawn 请求总数（vehicle / try_spawn / sensor）
    pub fn spawn_requests(&self) -> usize {
        self.state.lock().unwrap().spawn_requests
    }

    /// 已应用的天气
    pub fn weather_history(&self) -> Vec<WeatherParameters> {
        self.state.lock().unwrap().weather_history.clone()
    }

    /// 已加载的地图
    pub fn map_loads(&self) -> Vec<String> {
        self.state.lock().unwrap().map_loads.clone()
    }

    /// 当前地图
    pub fn current_map(&self) -> String {
        self.state.lock().unwrap().map.clone()
    }

    /// 已应用的车辆控制
    pub fn vehicle_controls(&self) -> Vec<(ActorId, VehicleControl)> {
        self.state.lock().unwrap().vehicle_controls.clone()
    }

    /// 已应用的行人控制
    pub fn walker_controls(&self) -> Vec<(ActorId, WalkerControl)> {
        self.state.lock().unwrap().walker_controls.clone()
    }

    pub fn spectator(&self) -> Option<Transform> {
        self.state.lock().unwrap().spectator
    }

    /// 生成过的 OpenDRIVE 文档
    pub fn generated_worlds(&self) -> Vec<String> {
        self.state.lock().unwrap().generated_worlds.clone()
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_connected(state: &MockState) -> Result<()> {
        if state.connected {
            Ok(())
        } else {
            Err(ActorFactoryError::connection("not connected"))
        }
    }

    /// 计数一次 spawn 请求，并检查注入的断线
    fn begin_spawn(&self, state: &mut MockState) -> Result<()> {
        Self::ensure_connected(state)?;
        if let Some(limit) = self.config.drop_connection_after_spawns {
            if state.spawn_requests == limit {
                state.spawn_requests += 1;
                return Err(ActorFactoryError::connection("connection reset by peer"));
            }
        }
        if self.config.timeout_on_spawn == Some(state.spawn_requests) {
            state.spawn_requests += 1;
            return Err(ActorFactoryError::RequestTimeout {
                operation: "spawn_actor".to_string(),
                timeout_secs: 10.0,
            });
        }
        state.spawn_requests += 1;
        Ok(())
    }

    fn kind_of(blueprint: &str) -> ActorKind {
        if blueprint.starts_with("vehicle.") {
            ActorKind::Vehicle
        } else if blueprint.starts_with("walker.") {
            ActorKind::Pedestrian
        } else if blueprint.starts_with("sensor.") {
            ActorKind::Camera
        } else {
            ActorKind::Prop
        }
    }

    fn insert_actor(
        &self,
        state: &mut MockState,
        blueprint: &str,
        transform: Transform,
        parent: Option<ActorId>,
    ) -> ActorId {
        let actor_id = self.allocate_actor_id();
        state.actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                kind: Self::kind_of(blueprint),
                transform,
                parent,
                autopilot: false,
            },
        );
        actor_id
    }

    fn known_blueprint(&self, blueprint: &str) -> bool {
        self.config.blueprints.iter().any(|b| b == blueprint)
    }

    fn reload(state: &mut MockState) -> WorldId {
        // 服务器重新加载世界时所有 actor 都会失效
        state.actors.clear();
        state.world_id += 1;
        state.world_id
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self, endpoint), fields(host = %endpoint.host, port = endpoint.port))]
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn world_id(&self) -> Result<WorldId> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        Ok(state.world_id)
    }

    async fn blueprint_ids(&self, filter: &str) -> Result<Vec<String>> {
        Self::ensure_connected(&self.state.lock().unwrap())?;
        Ok(self
            .config
            .blueprints
            .iter()
            .filter(|id| wildcard_match(filter, id))
            .cloned()
            .collect())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        Self::ensure_connected(&self.state.lock().unwrap())?;
        Ok(self.config.spawn_points.clone())
    }

    #[instrument(name = "mock_carla_spawn_vehicle", skip(self, transform), fields(blueprint = %blueprint))]
    async fn spawn_vehicle(&self, blueprint: &str, transform: Transform) -> Result<ActorId> {
        let mut state = self.state.lock().unwrap();
        self.begin_spawn(&mut state)?;

        if !self.known_blueprint(blueprint) {
            return Err(ActorFactoryError::spawn_rejected(
                blueprint,
                format!("blueprint '{blueprint}' not found"),
            ));
        }
        if self.config.reject_blueprints.iter().any(|b| b == blueprint) {
            return Err(ActorFactoryError::spawn_rejected(
                blueprint,
                "spawn failed because of collision at spawn position",
            ));
        }

        Ok(self.insert_actor(&mut state, blueprint, transform, None))
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        let actor = state
            .actors
            .get_mut(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;
        actor.autopilot = enabled;
        Ok(())
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        let locations = &self.config.navigation_locations;
        if locations.is_empty() {
            return Ok(None);
        }
        let pick = state.navigation_picks;
        state.navigation_picks += 1;
        Ok(Some(locations[pick % locations.len()]))
    }

    async fn has_waypoint(&self, _location: Location) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        // navigation_picks 已经自增，因此第 N 次选点对应 picks == N
        Ok(state.navigation_picks > self.config.off_road_locations)
    }

    #[instrument(name = "mock_carla_try_spawn", skip(self, transform), fields(blueprint = %blueprint))]
    async fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> Result<Option<ActorId>> {
        let mut state = self.state.lock().unwrap();
        self.begin_spawn(&mut state)?;

        if !self.known_blueprint(blueprint) {
            return Ok(None);
        }
        if Self::kind_of(blueprint) == ActorKind::Pedestrian {
            state.walker_attempts += 1;
            if state.walker_attempts <= self.config.occupied_walker_spawns {
                return Ok(None);
            }
        }

        Ok(Some(self.insert_actor(&mut state, blueprint, transform, None)))
    }

    #[instrument(
        name = "mock_carla_spawn_sensor",
        skip(self, transform, _attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        _attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        let mut state = self.state.lock().unwrap();
        self.begin_spawn(&mut state)?;

        // 验证 parent 存在
        if !state.actors.contains_key(&parent_id) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_id,
                "parent actor not found",
            ));
        }
        if self.config.fail_sensors {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_id,
                "mock failure",
            ));
        }

        Ok(self.insert_actor(&mut state, blueprint, transform, Some(parent_id)))
    }

    async fn apply_vehicle_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        if !state.actors.contains_key(&actor_id) {
            return Err(ActorFactoryError::ActorNotFound { actor_id });
        }
        state.vehicle_controls.push((actor_id, control));
        Ok(())
    }

    async fn apply_walker_control(&self, actor_id: ActorId, control: WalkerControl) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        if !state.actors.contains_key(&actor_id) {
            return Err(ActorFactoryError::ActorNotFound { actor_id });
        }
        state.walker_controls.push((actor_id, control));
        Ok(())
    }

    async fn set_weather(&self, weather: &WeatherParameters) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.weather_history.push(*weather);
        Ok(())
    }

    #[instrument(name = "mock_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<WorldId> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.map_loads.push(map.to_string());
        state.map = map.to_string();
        Ok(Self::reload(&mut state))
    }

    async fn generate_opendrive_world(
        &self,
        opendrive: &str,
        params: &OpendriveParams,
    ) -> Result<WorldId> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        if opendrive.trim().is_empty() || params.vertex_distance <= 0.0 {
            return Err(ActorFactoryError::WorldGeneration {
                message: "empty OpenDRIVE document".to_string(),
            });
        }
        state.generated_worlds.push(opendrive.to_string());
        state.map = "OpenDriveMap".to_string();
        Ok(Self::reload(&mut state))
    }

    async fn set_spectator_transform(&self, transform: Transform) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.spectator = Some(transform);
        Ok(())
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state
            .actors
            .get(&actor_id)
            .map(|actor| actor.transform)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // 幂等：即使不存在也返回 Ok
        self.state.lock().unwrap().actors.remove(&actor_id);
        Ok(())
    }

    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.state.lock().unwrap().actors.contains_key(&actor_id))
    }

    fn sensor_source(&self, actor_id: ActorId, sensor_id: String) -> Option<Box<dyn SensorSource>> {
        let state = self.state.lock().unwrap();
        match state.actors.get(&actor_id) {
            Some(actor) if actor.kind == ActorKind::Camera => Some(Box::new(MockSensor::new(
                sensor_id,
                self.config.camera.clone(),
            ))),
            _ => None,
        }
    }
}
