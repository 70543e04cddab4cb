//! `list-blueprints` command implementation.

use std::io::Write;

use actor_factory::CarlaClient;
use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ListBlueprintsArgs;

/// Execute the `list-blueprints` command
pub async fn run_list_blueprints<C: CarlaClient>(
    client: &C,
    args: &ListBlueprintsArgs,
    out: &mut impl Write,
) -> Result<usize> {
    let ids = client
        .blueprint_ids(&args.filter)
        .await
        .with_context(|| format!("Failed to list blueprints matching '{}'", args.filter))?;

    for id in &ids {
        writeln!(out, "{id}")?;
    }
    info!(filter = %args.filter, count = ids.len(), "blueprints listed");
    Ok(ids.len())
}
