//! Generic raster bitmap.

use std::sync::Arc;

use super::{Palette, PixelBuffer, PixelFormat, Shape};

/// Row alignment of raster bitmaps, in bytes.
pub const ROW_ALIGN: usize = 4;

/// A raster bitmap of any defined pixel format.
///
/// Rows are padded so the stride is a multiple of [`ROW_ALIGN`]. Indexed
/// bitmaps hold a reference to a shared [`Palette`].
///
/// # Example
///
/// ```
/// use rasterpool::{PixelBuffer, PixelFormat, RasterImage, Shape};
///
/// let image = RasterImage::new(Shape::new(5, 2, PixelFormat::Rgb24));
/// assert_eq!(image.stride(), 16);
/// assert_eq!(image.byte_len(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct RasterImage {
    shape: Shape,
    stride: usize,
    data: Vec<u8>,
    palette: Option<Arc<Palette>>,
}

impl RasterImage {
    /// Creates a zeroed bitmap of `shape` without a palette.
    pub fn new(shape: Shape) -> Self {
        let stride = shape.aligned_stride(ROW_ALIGN);
        Self {
            shape,
            stride,
            data: vec![0u8; stride * shape.height as usize],
            palette: None,
        }
    }

    /// Returns the palette, if this is an indexed bitmap.
    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    /// Returns row `y` without its padding bytes.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.shape.row_bytes()]
    }

    /// Returns row `y` mutably, without its padding bytes.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.shape.row_bytes();
        &mut self.data[start..start + len]
    }
}

impl PixelBuffer for RasterImage {
    fn allocate(shape: Shape, palette: Option<&Arc<Palette>>) -> Self {
        let mut image = Self::new(shape);
        if shape.format == PixelFormat::Indexed8 {
            image.palette = palette.cloned();
        }
        image
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn pixels(&self) -> &[u8] {
        &self.data
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_padding() {
        let image = RasterImage::new(Shape::new(3, 4, PixelFormat::Gray8));
        assert_eq!(image.stride(), 4);
        assert_eq!(image.byte_len(), 16);
        assert_eq!(image.pixels().len(), 16);
        assert_eq!(image.row(0).len(), 3);
    }

    #[test]
    fn test_indexed_keeps_shared_palette() {
        let palette = Arc::new(Palette::greyscale());
        let a = RasterImage::allocate(Shape::new(4, 4, PixelFormat::Indexed8), Some(&palette));
        let b = RasterImage::allocate(Shape::new(4, 4, PixelFormat::Indexed8), Some(&palette));
        assert!(Arc::ptr_eq(a.palette().unwrap(), b.palette().unwrap()));
        assert_eq!(Arc::strong_count(&palette), 3);
    }

    #[test]
    fn test_non_indexed_ignores_palette() {
        let palette = Arc::new(Palette::greyscale());
        let image = RasterImage::allocate(Shape::new(4, 4, PixelFormat::Rgba32), Some(&palette));
        assert!(image.palette().is_none());
    }

    #[test]
    fn test_row_mut() {
        let mut image = RasterImage::new(Shape::new(2, 2, PixelFormat::Rgb24));
        image.row_mut(1).copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(image.row(1), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&image.pixels()[8..14], &[1, 2, 3, 4, 5, 6]);
    }
}
