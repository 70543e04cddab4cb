//! minifb window surface

use minifb::{Key, Window, WindowOptions};

use crate::error::{DisplayError, Result};
use crate::frame::FrameBuffer;
use crate::input::KeyState;
use crate::surface::{DisplayConfig, DisplaySurface, SurfaceLauncher};

/// Opens a native window
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowLauncher;

impl SurfaceLauncher for WindowLauncher {
    fn launch(&self, config: &DisplayConfig) -> Result<Box<dyn DisplaySurface>> {
        let window = Window::new(
            &config.title,
            config.width,
            config.height,
            WindowOptions::default(),
        )
        .map_err(|e| DisplayError::window(e.to_string()))?;

        Ok(Box::new(WindowSurface { window }))
    }
}

struct WindowSurface {
    window: Window,
}

impl WindowSurface {
    fn held(&self, keys: &[Key]) -> bool {
        keys.iter().any(|&key| self.window.is_key_down(key))
    }
}

impl DisplaySurface for WindowSurface {
    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(frame.pixels(), frame.width(), frame.height())
            .map_err(|e| DisplayError::surface(e.to_string()))
    }

    fn key_state(&self) -> KeyState {
        KeyState {
            forward: self.held(&[Key::Up, Key::W]),
            backward: self.held(&[Key::Down, Key::S]),
            left: self.held(&[Key::Left, Key::A]),
            right: self.held(&[Key::Right, Key::D]),
        }
    }

    fn is_open(&self) -> bool {
        self.window.is_open()
    }

    fn pump(&mut self) {
        self.window.update();
    }
}
