use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::shared::constants;

/// Represents a 24-bit RGB color
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor(255, 255, 255);

    /// Squared euclidean distance in RGB space
    pub fn distance_sq(self, other: RgbColor) -> u32 {
        let dr = self.0 as i32 - other.0 as i32;
        let dg = self.1 as i32 - other.1 as i32;
        let db = self.2 as i32 - other.2 as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// One emulator screen: row-major RGBA, 4 bytes per pixel
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Frame {
    /// Opaque black frame
    pub fn new(width: usize, height: usize) -> Self {
        let mut data = vec![0u8; width * height * 4];
        for alpha in data.iter_mut().skip(3).step_by(4) {
            *alpha = 255;
        }
        Self { width, height, data }
    }

    pub fn screen() -> Self {
        Self::new(constants::SCREEN_WIDTH, constants::SCREEN_HEIGHT)
    }

    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height * 4 {
            anyhow::bail!(
                "RGBA buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                width * height * 4,
                width,
                height
            );
        }
        Ok(Self { width, height, data })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    #[inline(always)]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * 4
    }

    pub fn pixel(&self, x: usize, y: usize) -> RgbColor {
        self.rgb_at(y * self.width + x)
    }

    /// RGB of the `index`-th pixel in row-major order
    #[inline(always)]
    pub fn rgb_at(&self, index: usize) -> RgbColor {
        let o = index * 4;
        RgbColor(self.data[o], self.data[o + 1], self.data[o + 2])
    }

    /// Overwrite RGB, leaving alpha alone
    pub fn set_pixel(&mut self, x: usize, y: usize, color: RgbColor) {
        let o = self.offset(x, y);
        self.data[o] = color.0;
        self.data[o + 1] = color.1;
        self.data[o + 2] = color.2;
    }

    #[cfg(test)]
    pub fn alpha(&self, x: usize, y: usize) -> u8 {
        self.data[self.offset(x, y) + 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pixel_keeps_alpha() {
        let mut frame = Frame::new(3, 2);
        let o = frame.offset(2, 1);
        frame.data[o + 3] = 7;
        frame.set_pixel(2, 1, RgbColor(1, 2, 3));

        assert_eq!(frame.pixel(2, 1), RgbColor(1, 2, 3));
        assert_eq!(frame.alpha(2, 1), 7);
        assert_eq!(frame.rgb_at(5), RgbColor(1, 2, 3));
    }

    #[test]
    fn test_from_rgba_rejects_wrong_length() {
        assert!(Frame::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Frame::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_distance_is_unweighted() {
        assert_eq!(RgbColor(0, 0, 0).distance_sq(RgbColor(1, 2, 3)), 1 + 4 + 9);
        assert_eq!(RgbColor(255, 0, 0).distance_sq(RgbColor(0, 0, 0)), 255 * 255);
    }
}
