//! # Display
//!
//! Camera view and keyboard driving.
//!
//! - `frame`: camera image -> `0RGB` pixel buffer
//! - `input`: held keys -> `VehicleControl`
//! - `surface`: surface abstraction, headless surface
//! - `window`: minifb window (feature `window`)
//! - `worker`: the thread that owns the surface

pub mod error;
pub mod frame;
pub mod input;
pub mod surface;
#[cfg(feature = "window")]
pub mod window;
pub mod worker;

pub use error::{DisplayError, Result};
pub use frame::{render, FrameBuffer};
pub use input::{map_keys, KeyState};
pub use surface::{
    DisplayConfig, DisplaySurface, HeadlessLauncher, HeadlessProbe, SurfaceLauncher,
};
#[cfg(feature = "window")]
pub use window::WindowLauncher;
pub use worker::{ControlCommand, DisplayHandle, DisplayStatsSnapshot};
