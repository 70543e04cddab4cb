//! # Contracts
//!
//! Shared interface contracts between the workspace crates.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Ownership Model
//! - Every actor is owned by the CARLA server; the client only holds `ActorId` handles
//! - Handles stay valid until an explicit destroy or a world reload

mod catalog;
mod control;
mod error;
mod geom;
mod runtime;
mod sensor;
mod sensor_source;

pub use catalog::*;
pub use control::*;
pub use error::*;
pub use geom::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_source::{SensorDataCallback, SensorSource};
