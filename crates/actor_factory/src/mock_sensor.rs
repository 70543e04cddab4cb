//! Mock camera implementation
//!
//! Implements `SensorSource`, generates BGRA frames in a background thread.
//! Used for testing and for the offline demo backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    ImageData, ImageFormat, SensorDataCallback, SensorPacket, SensorPayload, SensorSource,
};
use tracing::{debug, trace};

/// Mock camera configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Send frequency (Hz)
    pub frequency_hz: f64,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            image_width: 800,
            image_height: 600,
        }
    }
}

/// Mock camera
///
/// Data is sent through the callback from a background thread, consistent
/// with real CARLA sensor behavior.
pub struct MockSensor {
    sensor_id: String,
    config: MockSensorConfig,
    listening: Arc<AtomicBool>,
    /// Bumped on every listen so a stale thread never outlives a restart
    generation: Arc<AtomicU64>,
}

impl MockSensor {
    /// Create new mock camera
    pub fn new(sensor_id: String, config: MockSensorConfig) -> Self {
        Self {
            sensor_id,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create mock camera with default configuration
    pub fn with_defaults(sensor_id: String) -> Self {
        Self::new(sensor_id, MockSensorConfig::default())
    }

    /// Diagonal BGRA gradient that scrolls with `frame_id`
    pub fn generate_image(config: &MockSensorConfig, frame_id: u64) -> ImageData {
        let (width, height) = (config.image_width, config.image_height);
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let shade = (x as u64 + y as u64 + frame_id) as u8;
                data.extend_from_slice(&[shade, (y % 256) as u8, (x % 256) as u8, 255]);
            }
        }

        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from(data),
        }
    }
}

impl SensorSource for MockSensor {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let sensor_id = self.sensor_id.clone();
        let config = self.config.clone();
        let listening = self.listening.clone();

        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);

        thread::spawn(move || {
            let mut frame_id: u64 = 0;
            let start_time = Instant::now();

            debug!(
                sensor_id = %sensor_id,
                frequency_hz = config.frequency_hz,
                "mock camera started"
            );

            while listening.load(Ordering::Relaxed) && current.load(Ordering::Relaxed) == generation
            {
                frame_id += 1;
                let packet = SensorPacket {
                    sensor_id: sensor_id.clone(),
                    timestamp: start_time.elapsed().as_secs_f64(),
                    frame_id: Some(frame_id),
                    payload: SensorPayload::Image(Self::generate_image(&config, frame_id)),
                };

                callback(packet);
                trace!(sensor_id = %sensor_id, frame_id, "mock frame sent");

                thread::sleep(interval);
            }

            debug!(sensor_id = %sensor_id, "mock camera stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
