//! World mutation: weather, map reload and road-network generation

use std::sync::Arc;

use contracts::{ActorId, Catalog, Location, Rotation, Transform, WorldId};
use tracing::{info, instrument, warn};

use crate::client::{CarlaClient, OpendriveParams};
use crate::error::{ActorFactoryError, Result};

/// Prop blueprint tiled under a generated road network
pub const GROUND_PROP_BLUEPRINT: &str = "static.prop.streetbarrier";

/// Meters between two grid props
pub const GROUND_PROP_SPACING: f64 = 50.0;

/// Top-down spectator pose used right after generation
pub const OVERVIEW_TRANSFORM: Transform = Transform {
    location: Location::new(0.0, 0.0, 50.0),
    rotation: Rotation {
        pitch: -90.0,
        yaw: 0.0,
        roll: 0.0,
    },
};

/// Result of a successful map reload
///
/// Every actor handle obtained before the reload belongs to the old world;
/// `invalidated_actors` tells the caller to discard them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChange {
    pub world: WorldId,
    pub map: String,
    pub invalidated_actors: bool,
}

/// Outcome of tiling ground props
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropGrid {
    pub placed: Vec<ActorId>,
    /// Positions the server refused (occupied)
    pub refused: usize,
}

/// Applies catalog-validated changes to the loaded world
pub struct WorldMutator<C: CarlaClient> {
    client: Arc<C>,
    catalog: Arc<Catalog>,
}

impl<C: CarlaClient> WorldMutator<C> {
    pub fn new(client: Arc<C>, catalog: Arc<Catalog>) -> Self {
        Self { client, catalog }
    }

    /// Apply a named weather preset
    ///
    /// An unknown name issues no request.
    #[instrument(name = "world_change_weather", skip(self))]
    pub async fn change_weather(&self, name: &str) -> Result<()> {
        let parameters = self.catalog.weather_preset(name).ok_or_else(|| {
            ActorFactoryError::UnrecognizedWeather {
                name: name.to_string(),
            }
        })?;

        self.client.set_weather(parameters).await?;
        info!(weather = name, "weather changed");
        Ok(())
    }

    /// Reload the world with another map
    ///
    /// An unknown name issues no request and leaves the world unchanged.
    #[instrument(name = "world_change_map", skip(self))]
    pub async fn change_map(&self, name: &str) -> Result<MapChange> {
        if !self.catalog.contains_map(name) {
            return Err(ActorFactoryError::UnrecognizedMap {
                name: name.to_string(),
            });
        }

        let world = self.client.load_world(name).await?;
        info!(map = name, world, "map loaded");
        Ok(MapChange {
            world,
            map: name.to_string(),
            invalidated_actors: true,
        })
    }

    /// Build a world from an OpenDRIVE document and look at it from above
    #[instrument(name = "world_generate", skip(self, opendrive, params), fields(bytes = opendrive.len()))]
    pub async fn generate_world(
        &self,
        opendrive: &str,
        params: &OpendriveParams,
    ) -> Result<WorldId> {
        let world = self.client.generate_opendrive_world(opendrive, params).await?;
        self.client.set_spectator_transform(OVERVIEW_TRANSFORM).await?;
        info!(world, "road network generated");
        Ok(world)
    }

    /// Tile props on a `(2n+1) x (2n+1)` grid centered on the origin
    ///
    /// Occupied positions are skipped, not errors.
    #[instrument(name = "world_place_prop_grid", skip(self))]
    pub async fn place_prop_grid(&self, half_extent: u32, spacing: f64) -> Result<PropGrid> {
        let mut grid = PropGrid::default();
        let n = half_extent as i64;

        for x in -n..=n {
            for y in -n..=n {
                let location = Location::new(x as f64 * spacing, y as f64 * spacing, -1.0);
                match self
                    .client
                    .try_spawn_actor(GROUND_PROP_BLUEPRINT, Transform::from_location(location))
                    .await?
                {
                    Some(actor_id) => grid.placed.push(actor_id),
                    None => grid.refused += 1,
                }
            }
        }

        if grid.refused > 0 {
            warn!(refused = grid.refused, "some ground props could not be placed");
        }
        info!(placed = grid.placed.len(), "ground props placed");
        Ok(grid)
    }

    /// Move the spectator onto an actor
    pub async fn follow(&self, actor_id: ActorId) -> Result<()> {
        let transform = self.client.actor_transform(actor_id).await?;
        self.client.set_spectator_transform(transform).await
    }
}
