//! Geometry primitives shared with the CARLA server.

use serde::{Deserialize, Serialize};

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    #[serde(default)]
    pub rotation: Rotation,
}

impl Transform {
    /// Transform at `location` with zero rotation
    pub fn from_location(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Location(x={:.2}, y={:.2}, z={:.2})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
