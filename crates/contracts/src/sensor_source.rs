//! SensorSource trait - Sensor data source abstraction
//!
//! Unified interface over real CARLA cameras and mock cameras, so the session
//! and the display worker never touch a concrete sensor type.

use std::sync::Arc;

use crate::SensorPacket;

/// Sensor data callback type
///
/// Invoked from the sensor's own thread whenever a frame is ready.
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type SensorDataCallback = Arc<dyn Fn(SensorPacket) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let camera: Box<dyn SensorSource> = client.sensor_source(camera_id, "pov".into())?;
/// camera.listen(Arc::new(|packet| {
///     println!("frame {:?}", packet.frame_id);
/// }));
/// // ...
/// camera.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Register data callback
    ///
    /// If already listening, repeated calls are no-ops (won't register multiple callbacks).
    fn listen(&self, callback: SensorDataCallback);

    /// Stop listening
    ///
    /// Safe to call when not listening, and after the underlying actor is gone.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
