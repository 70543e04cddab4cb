//! Catalog validation
//!
//! Rules:
//! - field ranges and non-empty strings (`validator` derive rules)
//! - at least one map and one vehicle
//! - vehicle display names unique, ignoring case
//! - map names and weather preset names unique

use std::collections::HashSet;

use contracts::{Catalog, ContractError};
use validator::Validate;

/// Validate a parsed catalog
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(catalog: &Catalog) -> Result<(), ContractError> {
    catalog
        .validate()
        .map_err(|e| ContractError::config_validation("catalog", e.to_string()))?;
    validate_not_empty(catalog)?;
    validate_vehicle_names(catalog)?;
    validate_map_names(catalog)?;
    validate_weather_names(catalog)?;
    Ok(())
}

fn validate_not_empty(catalog: &Catalog) -> Result<(), ContractError> {
    if catalog.maps.is_empty() {
        return Err(ContractError::config_validation(
            "maps",
            "at least one map is required",
        ));
    }
    if catalog.vehicles.is_empty() {
        return Err(ContractError::config_validation(
            "vehicles",
            "at least one vehicle is required",
        ));
    }
    Ok(())
}

/// Display names are looked up case-insensitively, so they must be unique that way
fn validate_vehicle_names(catalog: &Catalog) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for vehicle in &catalog.vehicles {
        if !seen.insert(vehicle.display_name.trim().to_lowercase()) {
            return Err(ContractError::config_validation(
                format!("vehicles[display_name={}]", vehicle.display_name),
                "duplicate vehicle display_name (case-insensitive)",
            ));
        }
    }
    Ok(())
}

fn validate_map_names(catalog: &Catalog) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for map in &catalog.maps {
        if map.trim().is_empty() {
            return Err(ContractError::config_validation("maps", "map name cannot be empty"));
        }
        if !seen.insert(map) {
            return Err(ContractError::config_validation(
                format!("maps[{map}]"),
                "duplicate map name",
            ));
        }
    }
    Ok(())
}

fn validate_weather_names(catalog: &Catalog) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for preset in &catalog.weather {
        if !seen.insert(&preset.name) {
            return Err(ContractError::config_validation(
                format!("weather[name={}]", preset.name),
                "duplicate weather preset",
            ));
        }
    }
    Ok(())
}
