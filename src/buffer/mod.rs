//! Pixel buffers managed by a pool.
//!
//! - [`PixelBuffer`] - Capability a pooled buffer provides (allocate, raw access, dispose)
//! - [`RasterImage`] - Generic raster bitmap with 4-byte aligned rows
//! - [`GreyImage`] - 8-bit greyscale image with tightly packed rows
//! - [`Shape`], [`PixelFormat`], [`Palette`] - Buffer geometry and colour table

mod grey;
mod raster;
mod shape;

use std::sync::Arc;

pub use grey::GreyImage;
pub use raster::{ROW_ALIGN, RasterImage};
pub use shape::{PALETTE_LEN, Palette, PixelFormat, Shape};

/// A fixed-shape block of pixel storage that a [`BufferPool`](crate::BufferPool)
/// can allocate, fill and reuse.
///
/// Storage is a single contiguous region of `stride * height` bytes.
pub trait PixelBuffer: Send + Sized + 'static {
    /// Allocates a new buffer of `shape`.
    ///
    /// `palette` is `Some` only for indexed formats; implementations that
    /// carry a colour table keep the shared reference.
    fn allocate(shape: Shape, palette: Option<&Arc<Palette>>) -> Self;

    /// Returns `true` if this buffer kind can hold pixels of `format`.
    fn supports(format: PixelFormat) -> bool {
        format.is_defined()
    }

    /// Returns the shape this buffer was allocated with.
    fn shape(&self) -> Shape;

    /// Returns the number of bytes per row, padding included.
    fn stride(&self) -> usize;

    /// Returns the whole pixel storage.
    fn pixels(&self) -> &[u8];

    /// Returns the whole pixel storage mutably.
    fn pixels_mut(&mut self) -> &mut [u8];

    /// Returns the size of the pixel storage in bytes.
    fn byte_len(&self) -> usize {
        self.stride() * self.shape().height as usize
    }

    /// Returns a raw pointer to the first pixel byte.
    fn as_ptr(&self) -> *const u8 {
        self.pixels().as_ptr()
    }

    /// Returns a raw mutable pointer to the first pixel byte.
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.pixels_mut().as_mut_ptr()
    }

    /// Frees the buffer.
    fn dispose(self) {
        drop(self);
    }
}
