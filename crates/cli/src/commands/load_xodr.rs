//! `load-xodr` command implementation.

use std::io::Write;
use std::sync::Arc;

use actor_factory::{ActorFactory, CarlaClient, OpendriveParams, WorldMutator};
use anyhow::{Context, Result};
use contracts::{ActorId, Catalog, WorldId};
use tracing::{info, warn};

use crate::cli::LoadXodrArgs;

/// Vehicle placed on a freshly generated road network
pub const SHOWCASE_VEHICLE: &str = "vehicle.tesla.model3";

/// What `load-xodr` left in the world
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XodrReport {
    pub world: WorldId,
    pub props: usize,
    pub vehicle: Option<ActorId>,
}

/// Execute the `load-xodr` command
///
/// Actors created here stay in the world after the command returns.
pub async fn run_load_xodr<C: CarlaClient>(
    client: Arc<C>,
    catalog: Arc<Catalog>,
    args: &LoadXodrArgs,
    out: &mut impl Write,
) -> Result<XodrReport> {
    let opendrive = tokio::fs::read_to_string(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    info!(path = %args.path.display(), bytes = opendrive.len(), "OpenDRIVE file loaded");

    let world = WorldMutator::new(client.clone(), catalog.clone());
    let world_id = world
        .generate_world(&opendrive, &OpendriveParams::default())
        .await
        .context("Failed to generate world")?;
    writeln!(out, "Generated world {world_id} from {}", args.path.display())?;

    let props = match args.props {
        Some(half_extent) => {
            let grid = world
                .place_prop_grid(half_extent, args.prop_spacing)
                .await
                .context("Failed to place ground props")?;
            writeln!(
                out,
                "Placed {} ground props ({} positions occupied)",
                grid.placed.len(),
                grid.refused
            )?;
            grid.placed.len()
        }
        None => 0,
    };

    let spawn_point = client.spawn_points().await?.first().copied();
    let vehicle = match spawn_point {
        Some(transform) => {
            let factory = ActorFactory::new(client.clone(), catalog);
            let spawned = factory
                .spawn_vehicle(SHOWCASE_VEHICLE, Some(transform))
                .await
                .context("Failed to spawn vehicle")?;
            world.follow(spawned.actor_id).await?;
            writeln!(
                out,
                "Spawned vehicle: {} at {}",
                spawned.blueprint, spawned.transform.location
            )?;
            Some(spawned.actor_id)
        }
        None => {
            warn!("generated map has no spawn points, no vehicle spawned");
            None
        }
    };

    Ok(XodrReport {
        world: world_id,
        props,
        vehicle,
    })
}
