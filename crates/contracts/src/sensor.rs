//! SensorPacket - camera callback output
//!
//! Sensor payloads are a tagged enum; the client boundary decides the variant
//! once, so consumers match instead of probing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Sensor data packet
///
/// Raw data received from a sensor callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPacket {
    /// Sensor ID
    pub sensor_id: String,

    /// CARLA simulation timestamp (seconds)
    pub timestamp: f64,

    /// Optional frame number (ordering/diagnostics)
    pub frame_id: Option<u64>,

    /// Data payload (zero-copy)
    pub payload: SensorPayload,
}

/// Sensor data payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// Camera image
    Image(ImageData),

    /// Anything the client does not recognise
    Raw(Bytes),
}

impl SensorPayload {
    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Raw(_) => "raw",
        }
    }
}

/// Image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Row-major pixel bytes, 4 per pixel
    pub data: Bytes,
}

impl ImageData {
    /// Byte length implied by the dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// Blue, green, red, alpha (CARLA RGB camera output)
    Bgra8,
    Rgba8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}
