//! Captured frames.
//!
//! - `Frame`: owned RGB24 pixel buffer produced by a frame source.
//! - `Rgb`: a single pixel, used by the overlay when annotating frames.
//!
//! Frames are produced fresh every cycle and dropped once they have been shown.

use anyhow::{anyhow, Result};

/// A single RGB pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Owned RGB24 frame.
///
/// Pixels are stored row-major, three bytes per pixel, with no row padding.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture sequence number assigned by the source (1-based).
    pub sequence: u64,
}

impl Frame {
    /// Wrap an RGB24 buffer. Fails when the buffer length does not match the dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            sequence,
        })
    }

    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Rgb, sequence: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let mut pixels = Vec::with_capacity(len);
        for _ in 0..len / 3 {
            pixels.extend_from_slice(&[color.0, color.1, color.2]);
        }
        Self::new(pixels, width, height, sequence)
    }

    pub fn as_rgb(&self) -> &[u8] {
        &self.pixels
    }

    /// Flip the frame left-to-right in place, so the preview behaves like a mirror.
    pub fn mirror_horizontal(&mut self) {
        let row_len = self.width as usize * 3;
        if row_len == 0 {
            return;
        }
        for row in self.pixels.chunks_exact_mut(row_len) {
            let w = row.len() / 3;
            for x in 0..w / 2 {
                let left = x * 3;
                let right = (w - 1 - x) * 3;
                for c in 0..3 {
                    row.swap(left + c, right + c);
                }
            }
        }
    }

    /// Pixel at (x, y), or `None` when outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let offset = self.offset(x, y)?;
        Some(Rgb(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ))
    }

    /// Write a pixel. Coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(offset) = self.offset(x as u32, y as u32) {
            self.pixels[offset] = color.0;
            self.pixels[offset + 1] = color.1;
            self.pixels[offset + 2] = color.2;
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 3)
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        assert!(Frame::new(vec![0u8; 5], 1, 2, 1).is_err());
    }

    #[test]
    fn mirror_swaps_columns() -> Result<()> {
        // 3x1: red, green, blue
        let mut frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, 1)?;
        frame.mirror_horizontal();
        assert_eq!(frame.pixel(0, 0), Some(Rgb(0, 0, 255)));
        assert_eq!(frame.pixel(1, 0), Some(Rgb(0, 255, 0)));
        assert_eq!(frame.pixel(2, 0), Some(Rgb(255, 0, 0)));
        Ok(())
    }

    #[test]
    fn put_pixel_ignores_out_of_bounds() -> Result<()> {
        let mut frame = Frame::filled(2, 2, Rgb(0, 0, 0), 1)?;
        frame.put_pixel(-1, 0, Rgb(9, 9, 9));
        frame.put_pixel(2, 0, Rgb(9, 9, 9));
        frame.put_pixel(1, 1, Rgb(9, 9, 9));
        assert_eq!(frame.pixel(1, 1), Some(Rgb(9, 9, 9)));
        assert_eq!(frame.pixel(0, 0), Some(Rgb(0, 0, 0)));
        Ok(())
    }
}
