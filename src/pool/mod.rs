//! Buffer pools.
//!
//! - [`BufferPool`] - Single-owner bounded pool, generic over [`PixelBuffer`](crate::PixelBuffer)
//! - [`SharedPool`] - The same pool behind a mutex, with a blocking checkout
//! - [`RasterPool`], [`GreyPool`] - The two concrete buffer kinds

mod engine;
mod fill;
mod shared;

pub use engine::BufferPool;
pub use shared::SharedPool;

use crate::buffer::{GreyImage, RasterImage};

/// Pool of generic raster bitmaps.
pub type RasterPool = BufferPool<RasterImage>;

/// Pool of 8-bit greyscale images.
pub type GreyPool = BufferPool<GreyImage>;
