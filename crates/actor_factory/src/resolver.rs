//! Blueprint resolution
//!
//! Maps a user-facing vehicle name to a server blueprint ID, or picks one at
//! random from the server's blueprint library.

use contracts::Catalog;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::{ActorFactoryError, Result};

/// Blueprint filter for random vehicle picks
pub const VEHICLE_FILTER: &str = "vehicle.*";

/// Blueprint filter for pedestrians
pub const PEDESTRIAN_FILTER: &str = "walker.pedestrian.*";

/// Look a vehicle name up in the catalog (case-insensitive)
pub fn lookup_vehicle(catalog: &Catalog, name: &str) -> Result<String> {
    catalog
        .find_vehicle(name)
        .map(|entry| entry.blueprint_id.clone())
        .ok_or_else(|| ActorFactoryError::UnknownVehicleName {
            name: name.to_string(),
        })
}

/// Uniform pick from a filtered blueprint list
pub fn pick_random<R: Rng + ?Sized>(ids: &[String], filter: &str, rng: &mut R) -> Result<String> {
    ids.choose(rng)
        .cloned()
        .ok_or_else(|| ActorFactoryError::EmptyCatalog {
            filter: filter.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::VehicleCatalogEntry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        Catalog {
            maps: vec!["Town01".to_string()],
            vehicles: vec![
                VehicleCatalogEntry {
                    display_name: "tesla model3".to_string(),
                    blueprint_id: "vehicle.tesla.model3".to_string(),
                },
                VehicleCatalogEntry {
                    display_name: "audi tt".to_string(),
                    blueprint_id: "vehicle.audi.tt".to_string(),
                },
            ],
            weather: vec![],
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(
            lookup_vehicle(&catalog, "Tesla Model3").unwrap(),
            "vehicle.tesla.model3"
        );
        assert_eq!(lookup_vehicle(&catalog, "audi tt").unwrap(), "vehicle.audi.tt");
    }

    #[test]
    fn test_lookup_unknown_name() {
        let err = lookup_vehicle(&catalog(), "flying carpet").unwrap_err();
        assert!(matches!(
            err,
            ActorFactoryError::UnknownVehicleName { ref name } if name == "flying carpet"
        ));
    }

    #[test]
    fn test_pick_random_from_list() {
        let ids = vec!["vehicle.a".to_string(), "vehicle.b".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = pick_random(&ids, VEHICLE_FILTER, &mut rng).unwrap();
            assert!(ids.contains(&picked));
        }
    }

    #[test]
    fn test_pick_random_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = pick_random(&[], VEHICLE_FILTER, &mut rng).unwrap_err();
        assert!(matches!(err, ActorFactoryError::EmptyCatalog { .. }));
    }
}
