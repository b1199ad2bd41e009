use std::path::Path;

use glam::{UVec2, Vec4};

use crate::api::CloudError;

/// Linear RGBA float render target.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    width: u32,
    height: u32,
    pub pixels: Vec<Vec4>,
}

impl ColorBuffer {
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self { width, height, pixels: vec![fill; (width * height) as usize] }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Reallocates when the size changes; returns whether it did.
    pub fn resize(&mut self, width: u32, height: u32, fill: Vec4) -> bool {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return false;
        }
        *self = Self::new(width, height, fill);
        true
    }

    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Clamped 8-bit RGBA, rows top to bottom.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            let c = px.clamp(Vec4::ZERO, Vec4::ONE) * 255.0 + Vec4::splat(0.5);
            bytes.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, c.w as u8]);
        }
        bytes
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), CloudError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        image::save_buffer(path, &self.to_rgba8(), self.width, self.height, image::ColorType::Rgba8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_conversion_clamps_and_rounds() {
        let mut buffer = ColorBuffer::new(2, 1, Vec4::ZERO);
        buffer.pixels[0] = Vec4::new(1.5, 0.5, -1.0, 1.0);
        buffer.pixels[1] = Vec4::new(0.0, 1.0 / 255.0, 0.2, 0.0);
        assert_eq!(buffer.to_rgba8(), vec![255, 128, 0, 255, 0, 1, 51, 0]);
    }

    #[test]
    fn resize_reports_changes_only() {
        let mut buffer = ColorBuffer::new(4, 4, Vec4::ONE);
        assert!(!buffer.resize(4, 4, Vec4::ZERO));
        assert_eq!(buffer.get(3, 3), Vec4::ONE);
        assert!(buffer.resize(8, 2, Vec4::ZERO));
        assert_eq!(buffer.pixels.len(), 16);
        assert_eq!(buffer.size(), UVec2::new(8, 2));
    }

    #[test]
    fn zero_sized_buffers_are_promoted_to_one_pixel() {
        let buffer = ColorBuffer::new(0, 0, Vec4::ZERO);
        assert_eq!(buffer.pixels.len(), 1);
    }
}
