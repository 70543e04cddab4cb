//! Display surface abstraction
//!
//! A surface is created and used on the display worker thread only; the
//! launcher is what crosses threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::frame::FrameBuffer;
use crate::input::KeyState;

/// Window parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub title: String,
    pub width: usize,
    pub height: usize,
    /// Pending frames before the live feed starts dropping
    pub queue_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "CARLA Auto Control".to_string(),
            width: 800,
            height: 600,
            queue_capacity: 4,
        }
    }
}

/// Something frames can be presented on
pub trait DisplaySurface {
    /// Show a full frame
    fn present(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Keys currently held
    fn key_state(&self) -> KeyState;

    /// False once the user closed the window
    fn is_open(&self) -> bool;

    /// Process window events without drawing
    fn pump(&mut self) {}
}

/// Creates surfaces on the display worker thread
pub trait SurfaceLauncher: Send + Sync {
    fn launch(&self, config: &DisplayConfig) -> Result<Box<dyn DisplaySurface>>;
}

/// Shared view into a headless surface
#[derive(Debug, Default)]
pub struct HeadlessProbe {
    presented: AtomicU64,
    keys: Mutex<KeyState>,
    last_frame: Mutex<Option<FrameBuffer>>,
    closed: AtomicBool,
}

impl HeadlessProbe {
    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::SeqCst)
    }

    /// Script the keys reported by the surface
    pub fn set_keys(&self, keys: KeyState) {
        if let Ok(mut held) = self.keys.lock() {
            *held = keys;
        }
    }

    pub fn last_frame(&self) -> Option<FrameBuffer> {
        self.last_frame.lock().ok().and_then(|frame| frame.clone())
    }

    /// Simulate the user closing the window
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Launcher for surfaces that only count frames
#[derive(Debug, Clone, Default)]
pub struct HeadlessLauncher {
    probe: Arc<HeadlessProbe>,
}

impl HeadlessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> Arc<HeadlessProbe> {
        self.probe.clone()
    }
}

impl SurfaceLauncher for HeadlessLauncher {
    fn launch(&self, _config: &DisplayConfig) -> Result<Box<dyn DisplaySurface>> {
        self.probe.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(HeadlessSurface {
            probe: self.probe.clone(),
        }))
    }
}

struct HeadlessSurface {
    probe: Arc<HeadlessProbe>,
}

impl DisplaySurface for HeadlessSurface {
    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        if let Ok(mut last) = self.probe.last_frame.lock() {
            *last = Some(frame.clone());
        }
        self.probe.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn key_state(&self) -> KeyState {
        self.probe.keys.lock().map(|keys| *keys).unwrap_or_default()
    }

    fn is_open(&self) -> bool {
        !self.probe.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DisplayConfig::default();
        assert_eq!(config.title, "CARLA Auto Control");
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn test_headless_counts_frames() {
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        let mut surface = launcher.launch(&DisplayConfig::default()).unwrap();

        surface.present(&FrameBuffer::new(2, 2)).unwrap();
        surface.present(&FrameBuffer::new(2, 2)).unwrap();
        assert_eq!(probe.presented(), 2);
        assert_eq!(probe.last_frame(), Some(FrameBuffer::new(2, 2)));

        probe.set_keys(KeyState {
            forward: true,
            ..Default::default()
        });
        assert!(surface.key_state().forward);

        probe.close();
        assert!(!surface.is_open());
    }
}
