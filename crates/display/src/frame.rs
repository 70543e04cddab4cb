//! Sensor frame renderer
//!
//! Converts camera images into the display's row-major `0RGB` pixel buffer.

use contracts::{ImageData, ImageFormat, SensorPacket, SensorPayload};

use crate::error::{DisplayError, Result};

/// Pixel buffer owned by the display
///
/// One `u32` per pixel, `0x00RRGGBB`, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Black buffer of the given size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, `None` outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Blit a camera frame at (0, 0), clipped to the buffer
    ///
    /// Area not covered by the image is cleared. Non-image payloads and
    /// images whose byte length disagrees with their dimensions are rejected
    /// before any pixel is touched.
    pub fn blit(&mut self, packet: &SensorPacket) -> Result<()> {
        let image = match &packet.payload {
            SensorPayload::Image(image) => image,
            other => {
                return Err(DisplayError::UnsupportedFrameType { kind: other.kind() });
            }
        };

        let expected = image.expected_len();
        if image.data.len() != expected {
            return Err(DisplayError::MalformedFrame {
                expected,
                actual: image.data.len(),
            });
        }

        self.blit_image(image);
        Ok(())
    }

    fn blit_image(&mut self, image: &ImageData) {
        let src_width = image.width as usize;
        let bpp = image.format.bytes_per_pixel();
        let cols = src_width.min(self.width);
        let rows = (image.height as usize).min(self.height);

        if cols < self.width || rows < self.height {
            self.pixels.fill(0);
        }

        for y in 0..rows {
            let src_row = &image.data[y * src_width * bpp..][..cols * bpp];
            let dst_row = &mut self.pixels[y * self.width..][..cols];
            for (dst, px) in dst_row.iter_mut().zip(src_row.chunks_exact(bpp)) {
                *dst = pack_rgb(image.format, px);
            }
        }
    }
}

/// One source pixel to `0x00RRGGBB`; alpha is dropped
fn pack_rgb(format: ImageFormat, px: &[u8]) -> u32 {
    let (r, g, b) = match format {
        ImageFormat::Bgra8 => (px[2], px[1], px[0]),
        ImageFormat::Rgba8 => (px[0], px[1], px[2]),
    };
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Render a frame into a fresh buffer of the surface size
pub fn render(packet: &SensorPacket, width: usize, height: usize) -> Result<FrameBuffer> {
    let mut buffer = FrameBuffer::new(width, height);
    buffer.blit(packet)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn image_packet(width: u32, height: u32, data: Vec<u8>) -> SensorPacket {
        SensorPacket {
            sensor_id: "camera".to_string(),
            timestamp: 0.0,
            frame_id: Some(1),
            payload: SensorPayload::Image(ImageData {
                width,
                height,
                format: ImageFormat::Bgra8,
                data: Bytes::from(data),
            }),
        }
    }

    #[test]
    fn test_bgra_to_rgb() {
        // 2x1: pure blue, then B=1 G=2 R=3 with alpha 200
        let packet = image_packet(2, 1, vec![255, 0, 0, 255, 1, 2, 3, 200]);
        let buffer = render(&packet, 2, 1).unwrap();
        assert_eq!(buffer.pixel(0, 0), Some(0x0000_00FF));
        assert_eq!(buffer.pixel(1, 0), Some(0x0003_0201));
    }

    #[test]
    fn test_row_major_addressing() {
        // 2x2, red channel encodes x + 10 * y
        let mut data = Vec::new();
        for y in 0..2u8 {
            for x in 0..2u8 {
                data.extend_from_slice(&[0, 0, x + 10 * y, 255]);
            }
        }
        let buffer = render(&image_packet(2, 2, data), 2, 2).unwrap();
        assert_eq!(buffer.pixel(1, 0), Some(1 << 16));
        assert_eq!(buffer.pixel(0, 1), Some(10 << 16));
        assert_eq!(buffer.pixel(1, 1), Some(11 << 16));
    }

    #[test]
    fn test_clipped_to_surface() {
        let data = vec![0, 0, 0xAA, 255].repeat(4 * 3);
        let buffer = render(&image_packet(4, 3, data), 2, 2).unwrap();
        assert_eq!(buffer.pixels(), &[0xAA_0000; 4]);
    }

    #[test]
    fn test_smaller_image_leaves_black_border() {
        let mut buffer = FrameBuffer::new(3, 2);
        buffer
            .blit(&image_packet(3, 2, vec![9, 9, 9, 255].repeat(6)))
            .unwrap();
        buffer
            .blit(&image_packet(1, 1, vec![0, 0, 0xFF, 255]))
            .unwrap();
        assert_eq!(buffer.pixel(0, 0), Some(0xFF_0000));
        assert_eq!(buffer.pixel(2, 1), Some(0));
    }

    #[test]
    fn test_rejects_raw_payload() {
        let packet = SensorPacket {
            sensor_id: "lidar".to_string(),
            timestamp: 0.0,
            frame_id: None,
            payload: SensorPayload::Raw(Bytes::from_static(&[1, 2, 3])),
        };
        let err = render(&packet, 2, 2).unwrap_err();
        assert!(matches!(err, DisplayError::UnsupportedFrameType { kind: "raw" }));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let mut buffer = FrameBuffer::new(2, 2);
        let before = buffer.clone();
        let err = buffer.blit(&image_packet(2, 2, vec![0; 15])).unwrap_err();
        assert!(matches!(
            err,
            DisplayError::MalformedFrame {
                expected: 16,
                actual: 15
            }
        ));
        assert_eq!(buffer, before);
    }
}
