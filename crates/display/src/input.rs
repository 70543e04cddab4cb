//! Keyboard state to vehicle control

use contracts::VehicleControl;

/// Driving keys held during the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    /// Up / W
    pub forward: bool,
    /// Down / S
    pub backward: bool,
    /// Left / A
    pub left: bool,
    /// Right / D
    pub right: bool,
}

/// Map held keys to a vehicle control
///
/// Forward wins over backward and left wins over right. Backward drives in
/// reverse at full throttle.
pub fn map_keys(keys: &KeyState) -> VehicleControl {
    let (throttle, reverse) = if keys.forward {
        (1.0, false)
    } else if keys.backward {
        (1.0, true)
    } else {
        (0.0, false)
    };

    let steer = if keys.left {
        -1.0
    } else if keys.right {
        1.0
    } else {
        0.0
    };

    VehicleControl {
        throttle,
        steer,
        reverse,
        ..Default::default()
    }
}
