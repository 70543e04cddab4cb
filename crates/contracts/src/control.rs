//! Actuation commands sent to vehicles and walkers.

use serde::{Deserialize, Serialize};

use crate::Vector3;

/// Vehicle actuation command
///
/// Mirrors the server's `VehicleControl`; fields left at their default are neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// Throttle in [0.0, 1.0]
    pub throttle: f32,
    /// Steering in [-1.0, 1.0], negative is left
    pub steer: f32,
    /// Brake in [0.0, 1.0]
    pub brake: f32,
    pub hand_brake: bool,
    pub reverse: bool,
}

/// Walker actuation command
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkerControl {
    /// Walking direction (world frame)
    pub direction: Vector3,
    /// Speed in m/s
    pub speed: f32,
    pub jump: bool,
}
