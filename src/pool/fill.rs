//! Filling checked-out buffers.
//!
//! A [`Filler`] holds a copy of everything a fill needs from its pool, so a
//! buffer can be filled while the pool itself is not borrowed (or locked).

#[cfg(feature = "decode")]
use std::path::Path;

use tracing::trace;

use crate::buffer::{PixelBuffer, Shape};
use crate::copy::ParallelCopy;
use crate::error::{PoolError, Result};

#[derive(Debug, Clone)]
pub(super) struct Filler {
    shape: Shape,
    copier: ParallelCopy,
}

impl Filler {
    pub(super) fn new(shape: Shape, copier: ParallelCopy) -> Self {
        Self { shape, copier }
    }

    /// Rejects a source buffer whose layout differs from the pool's.
    pub(super) fn check_layout(&self, src: Shape) -> Result<()> {
        if self.shape.is_layout_compatible(&src) {
            Ok(())
        } else {
            Err(PoolError::ShapeMismatch {
                expected: self.shape,
                actual: src,
            })
        }
    }

    /// Copies `stride * height` bytes from `src` into the whole storage.
    ///
    /// # Safety
    ///
    /// `src` must be non-null and valid for reads of `stride * height` bytes.
    pub(super) unsafe fn from_ptr<B: PixelBuffer>(
        &self,
        buffer: &mut B,
        src: *const u8,
    ) -> Result<()> {
        let expected = buffer.byte_len();
        let pixels = buffer.pixels_mut();
        let size = pixels.len();
        // Storage length is never taken from the trait's stride
        if size != expected {
            return Err(PoolError::SizeMismatch {
                expected,
                actual: size,
            });
        }
        // SAFETY: `pixels` is the exclusively borrowed storage of `buffer`,
        // `size` bytes long; `src` covers `size` bytes by the caller's
        // contract since `size == stride * height`.
        unsafe { self.copier.copy_raw(pixels.as_mut_ptr(), src, size) }.map(|_| ())
    }

    /// Copies the first `stride * height` bytes of `src`.
    pub(super) fn from_slice<B: PixelBuffer>(&self, buffer: &mut B, src: &[u8]) -> Result<()> {
        let len = buffer.byte_len();
        if src.len() < len {
            return Err(PoolError::SizeMismatch {
                expected: len,
                actual: src.len(),
            });
        }
        self.copier.copy(buffer.pixels_mut(), &src[..len]).map(|_| ())
    }

    /// Copies pixel rows of `src_stride` bytes, re-packing when strides differ.
    pub(super) fn from_rows<B: PixelBuffer>(
        &self,
        buffer: &mut B,
        src: &[u8],
        src_stride: usize,
    ) -> Result<()> {
        let dst_stride = buffer.stride();
        if dst_stride == src_stride {
            self.copier.copy(buffer.pixels_mut(), src).map(|_| ())
        } else {
            trace!(dst_stride, src_stride, "re-packing rows");
            self.copier.copy_rows(
                buffer.pixels_mut(),
                dst_stride,
                src,
                src_stride,
                self.shape.row_bytes(),
            )
        }
    }

    /// Decodes `path` into a scratch bitmap and copies it in.
    ///
    /// The scratch bitmap is dropped before this returns.
    #[cfg(feature = "decode")]
    pub(super) fn from_path<B: PixelBuffer>(&self, buffer: &mut B, path: &Path) -> Result<()> {
        let scratch = crate::decode::decode_scratch(path, self.shape)?;
        self.from_rows(buffer, scratch.pixels(), scratch.stride())
    }
}
