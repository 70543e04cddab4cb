//! `catalog` command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use config_loader::CatalogLoader;
use contracts::Catalog;

use crate::cli::CatalogArgs;

/// Execute the `catalog` command
pub fn run_catalog(catalog: &Catalog, args: &CatalogArgs, out: &mut impl Write) -> Result<()> {
    if args.json {
        let json = CatalogLoader::to_json(catalog).context("Failed to serialize catalog")?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(out, "\n=== Catalog ===\n")?;
    writeln!(out, "Maps ({}):", catalog.maps.len())?;
    for map in &catalog.maps {
        writeln!(out, "  - {map}")?;
    }

    writeln!(out, "\nVehicles ({}):", catalog.vehicles.len())?;
    for entry in &catalog.vehicles {
        writeln!(out, "  - {} ({})", entry.display_name, entry.blueprint_id)?;
    }

    writeln!(out, "\nWeather ({}):", catalog.weather.len())?;
    for preset in &catalog.weather {
        let p = &preset.parameters;
        writeln!(
            out,
            "  - {}: cloudiness {:.0}, precipitation {:.0}, sun altitude {:.0}",
            preset.name, p.cloudiness, p.precipitation, p.sun_altitude_angle
        )?;
    }
    writeln!(out)?;
    Ok(())
}
