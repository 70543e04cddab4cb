//! Catalog - Config Loader output
//!
//! Immutable lookup tables injected at startup: vehicle names, map names and
//! weather presets. Nothing mutates a `Catalog` after it has been validated.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Static lookup tables
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Catalog {
    /// Loadable maps (exact names)
    pub maps: Vec<String>,

    /// User-facing vehicle names, in menu order
    #[validate(nested)]
    pub vehicles: Vec<VehicleCatalogEntry>,

    /// Weather presets, in menu order
    #[validate(nested)]
    pub weather: Vec<WeatherPreset>,
}

/// Vehicle display name -> blueprint ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VehicleCatalogEntry {
    /// Name shown in the menu (matched case-insensitively)
    #[validate(length(min = 1))]
    pub display_name: String,

    /// Server blueprint ID (e.g., "vehicle.tesla.model3")
    #[validate(length(min = 1))]
    pub blueprint_id: String,
}

/// Named weather bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeatherPreset {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(nested)]
    pub parameters: WeatherParameters,
}

/// Weather parameters understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeatherParameters {
    #[validate(range(min = 0.0, max = 100.0))]
    pub cloudiness: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub precipitation: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub precipitation_deposits: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub wind_intensity: f32,
    #[validate(range(min = 0.0, max = 360.0))]
    pub sun_azimuth_angle: f32,
    #[validate(range(min = -90.0, max = 90.0))]
    pub sun_altitude_angle: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub fog_density: f32,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub fog_distance: f32,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub fog_falloff: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub wetness: f32,
}

impl Catalog {
    /// Case-insensitive vehicle lookup
    pub fn find_vehicle(&self, name: &str) -> Option<&VehicleCatalogEntry> {
        let needle = name.trim().to_lowercase();
        self.vehicles
            .iter()
            .find(|entry| entry.display_name.to_lowercase() == needle)
    }

    /// Vehicle entry by zero-based menu position
    pub fn vehicle_at(&self, index: usize) -> Option<&VehicleCatalogEntry> {
        self.vehicles.get(index)
    }

    /// Whether `name` is one of the loadable maps
    pub fn contains_map(&self, name: &str) -> bool {
        self.maps.iter().any(|map| map == name)
    }

    /// Parameters of the preset called `name`
    pub fn weather_preset(&self, name: &str) -> Option<&WeatherParameters> {
        self.weather
            .iter()
            .find(|preset| preset.name == name)
            .map(|preset| &preset.parameters)
    }

    /// Preset names in menu order
    pub fn weather_names(&self) -> impl Iterator<Item = &str> {
        self.weather.iter().map(|preset| preset.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cloudiness: f32) -> WeatherParameters {
        WeatherParameters {
            cloudiness,
            precipitation: 0.0,
            precipitation_deposits: 0.0,
            wind_intensity: 10.0,
            sun_azimuth_angle: 0.0,
            sun_altitude_angle: 45.0,
            fog_density: 2.0,
            fog_distance: 0.75,
            fog_falloff: 0.1,
            wetness: 0.0,
        }
    }

    fn sample_catalog() -> Catalog {
        Catalog {
            maps: vec!["Town01".into(), "Town10HD".into()],
            vehicles: vec![
                VehicleCatalogEntry {
                    display_name: "tesla model 3".into(),
                    blueprint_id: "vehicle.tesla.model3".into(),
                },
                VehicleCatalogEntry {
                    display_name: "audi tt".into(),
                    blueprint_id: "vehicle.audi.tt".into(),
                },
            ],
            weather: vec![WeatherPreset {
                name: "clear".into(),
                parameters: params(5.0),
            }],
        }
    }

    #[test]
    fn find_vehicle_ignores_case() {
        let catalog = sample_catalog();
        let entry = catalog.find_vehicle("Tesla Model 3").unwrap();
        assert_eq!(entry.blueprint_id, "vehicle.tesla.model3");
        assert!(catalog.find_vehicle("TESLA MODEL 3").is_some());
        assert!(catalog.find_vehicle("tesla").is_none());
    }

    #[test]
    fn map_names_are_exact() {
        let catalog = sample_catalog();
        assert!(catalog.contains_map("Town01"));
        assert!(!catalog.contains_map("town01"));
        assert!(!catalog.contains_map("Town99"));
    }

    #[test]
    fn weather_lookup() {
        let catalog = sample_catalog();
        assert_eq!(catalog.weather_preset("clear").unwrap().cloudiness, 5.0);
        assert!(catalog.weather_preset("hurricane").is_none());
        assert_eq!(catalog.weather_names().collect::<Vec<_>>(), vec!["clear"]);
    }

    #[test]
    fn out_of_range_weather_fails_validation() {
        let mut catalog = sample_catalog();
        catalog.weather[0].parameters.cloudiness = 150.0;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn serde_round_trip_keeps_order() {
        let catalog = sample_catalog();
        let json = serde_json::to_string(&catalog).unwrap();
        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vehicles, catalog.vehicles);
        assert_eq!(back.maps, catalog.maps);
    }
}
