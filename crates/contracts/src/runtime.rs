//! SessionRegistry - actors tracked by an interactive session
//!
//! Each tracked vehicle carries its camera and manual-driving flag in the same
//! entry, so vehicles, cameras and flags always have equal length.

/// CARLA actor handle type
pub type ActorId = u32;

/// CARLA world (episode) identifier, changes on every reload
pub type WorldId = u64;

/// Actor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Vehicle,
    Pedestrian,
    Camera,
    Prop,
}

impl ActorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Pedestrian => "pedestrian",
            Self::Camera => "camera",
            Self::Prop => "prop",
        }
    }
}

/// A vehicle together with its attached camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVehicle {
    pub actor_id: ActorId,
    /// Blueprint ID of the vehicle
    pub type_id: String,
    pub camera_id: ActorId,
    pub manual_driving: bool,
}

/// Actor handle scheduled for destruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedActor {
    pub actor_id: ActorId,
    pub kind: ActorKind,
}

/// Actors spawned by the session
///
/// Mutated only by the session loop. Entries are appended on successful spawns
/// and removed in bulk, never one by one.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    vehicles: Vec<TrackedVehicle>,
    pedestrians: Vec<ActorId>,
}

impl SessionRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vehicle and its camera (manual driving off)
    pub fn register_vehicle(
        &mut self,
        actor_id: ActorId,
        type_id: impl Into<String>,
        camera_id: ActorId,
    ) -> usize {
        self.vehicles.push(TrackedVehicle {
            actor_id,
            type_id: type_id.into(),
            camera_id,
            manual_driving: false,
        });
        self.vehicles.len() - 1
    }

    /// Register pedestrian
    pub fn register_pedestrian(&mut self, actor_id: ActorId) {
        self.pedestrians.push(actor_id);
    }

    pub fn vehicle(&self, index: usize) -> Option<&TrackedVehicle> {
        self.vehicles.get(index)
    }

    pub fn vehicles(&self) -> &[TrackedVehicle] {
        &self.vehicles
    }

    pub fn pedestrians(&self) -> &[ActorId] {
        &self.pedestrians
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.vehicles.iter().map(|v| v.actor_id)
    }

    pub fn camera_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.vehicles.iter().map(|v| v.camera_id)
    }

    pub fn manual_driving_flags(&self) -> impl Iterator<Item = bool> + '_ {
        self.vehicles.iter().map(|v| v.manual_driving)
    }

    /// Set the manual-driving flag, returns false for an unknown index
    pub fn set_manual_driving(&mut self, index: usize, enabled: bool) -> bool {
        match self.vehicles.get_mut(index) {
            Some(vehicle) => {
                vehicle.manual_driving = enabled;
                true
            }
            None => false,
        }
    }

    /// Number of tracked vehicles
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Number of tracked actors of every kind
    pub fn actor_count(&self) -> usize {
        self.vehicles.len() * 2 + self.pedestrians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.pedestrians.is_empty()
    }

    /// Remove every entry and return them in teardown order
    ///
    /// Cameras come first so no sensor outlives its parent vehicle.
    pub fn drain(&mut self) -> Vec<TrackedActor> {
        let vehicles = std::mem::take(&mut self.vehicles);
        let pedestrians = std::mem::take(&mut self.pedestrians);

        let cameras = vehicles.iter().map(|v| TrackedActor {
            actor_id: v.camera_id,
            kind: ActorKind::Camera,
        });
        let bodies = vehicles.iter().map(|v| TrackedActor {
            actor_id: v.actor_id,
            kind: ActorKind::Vehicle,
        });
        let walkers = pedestrians.iter().map(|&actor_id| TrackedActor {
            actor_id,
            kind: ActorKind::Pedestrian,
        });

        cameras.chain(bodies).chain(walkers).collect()
    }
}
