//! 8-bit greyscale image with packed rows.

use std::sync::Arc;

use super::{Palette, PixelBuffer, PixelFormat, Shape};

/// An 8-bit greyscale image whose stride equals its width.
///
/// Only [`PixelFormat::Gray8`] is supported.
#[derive(Debug, Clone)]
pub struct GreyImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GreyImage {
    /// Creates a zeroed image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    /// Returns the pixel at `(x, y)`, or `None` if out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl PixelBuffer for GreyImage {
    fn allocate(shape: Shape, _palette: Option<&Arc<Palette>>) -> Self {
        Self::new(shape.width, shape.height)
    }

    fn supports(format: PixelFormat) -> bool {
        format == PixelFormat::Gray8
    }

    fn shape(&self) -> Shape {
        Shape::new(self.width, self.height, PixelFormat::Gray8)
    }

    fn stride(&self) -> usize {
        self.width as usize
    }

    fn pixels(&self) -> &[u8] {
        &self.data
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
