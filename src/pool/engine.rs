//! Bounded pool of fixed-shape buffers.
//!
//! - [`BufferPool`] - Pre-warmed, grow-on-demand pool with FIFO reuse
//! - `get_instance*()` - Check a buffer out, optionally filled from a source
//! - `return_instance()` - Hand a buffer back for reuse
//! - `release()` - Dispose idle buffers and retire the pool
//!
//! # Example
//!
//! ```
//! use rasterpool::{PixelFormat, RasterPool};
//!
//! let mut pool = RasterPool::new(64, 64, PixelFormat::Indexed8, 5, 10)?;
//!
//! let frame = pool.get_instance()?;
//! assert_eq!(pool.count(), 4);
//!
//! pool.return_instance(frame)?;
//! assert_eq!(pool.count(), 5);
//! # Ok::<(), rasterpool::PoolError>(())
//! ```

#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt;
#[cfg(feature = "decode")]
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::{GreyImage, Palette, PixelBuffer, PixelFormat, Shape};
use crate::config::PoolConfig;
use crate::copy::ParallelCopy;
use crate::error::{PoolError, Result};

use super::fill::Filler;

/// A bounded, reusable collection of buffers sharing one [`Shape`].
///
/// The pool allocates `capacity` buffers up front and grows by one buffer per
/// checkout when no idle buffer is left, until `limit` buffers exist. Idle
/// buffers are reused first-in first-out, so every buffer gets its turn.
///
/// # Ownership
///
/// A checked-out buffer is moved to the caller and owned exclusively until
/// it is passed back to [`return_instance`](Self::return_instance). Buffers
/// that are never returned simply stay allocated by the caller; the pool
/// still counts them against `limit`.
///
/// # Concurrency
///
/// Every operation takes `&mut self`, so access is exclusive by
/// construction. Wrap the pool in a [`SharedPool`](crate::SharedPool) to use
/// it from several threads.
///
/// # Contents
///
/// A recycled buffer still holds whatever its previous holder wrote. Use one
/// of the filling checkouts, or overwrite it before reading.
pub struct BufferPool<B: PixelBuffer> {
    idle: VecDeque<B>,
    shape: Shape,
    capacity: usize,
    limit: usize,
    alive: bool,
    palette: Option<Arc<Palette>>,
    copier: ParallelCopy,
    #[cfg(debug_assertions)]
    issued: HashSet<usize>,
}

impl<B: PixelBuffer> BufferPool<B> {
    /// Creates a pool of `capacity` pre-allocated buffers that may grow to
    /// `limit` buffers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if a dimension is zero, the format
    /// is undefined or unsupported by `B`, or `capacity >= limit`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        capacity: usize,
        limit: usize,
    ) -> Result<Self> {
        Self::with_config(PoolConfig::new(width, height, format, capacity, limit)?)
    }

    /// Creates a pool from a configuration.
    ///
    /// Indexed formats get one greyscale palette, built here and shared by
    /// every buffer the pool ever allocates.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        if !B::supports(config.format()) {
            return Err(PoolError::InvalidConfig {
                message: "pixel format is not supported by this buffer kind",
            });
        }

        let shape = config.shape();
        let palette = shape
            .format
            .is_indexed()
            .then(|| Arc::new(Palette::greyscale()));
        let idle: VecDeque<B> = (0..config.capacity())
            .map(|_| B::allocate(shape, palette.as_ref()))
            .collect();

        debug!(
            %shape,
            capacity = config.capacity(),
            limit = config.limit(),
            "buffer pool created"
        );

        Ok(Self {
            idle,
            shape,
            capacity: config.capacity(),
            limit: config.limit(),
            alive: true,
            palette,
            copier: ParallelCopy::new(*config.copy_config()),
            #[cfg(debug_assertions)]
            issued: HashSet::new(),
        })
    }

    /// Replaces the copier used to fill buffers.
    pub fn with_copier(mut self, copier: ParallelCopy) -> Self {
        self.copier = copier;
        self
    }

    /// Checks out a buffer with unspecified contents.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] if no buffer is idle and `limit` buffers exist
    /// - [`PoolError::Released`] if the pool was released
    pub fn get_instance(&mut self) -> Result<B> {
        self.checkout()
    }

    /// Checks out a buffer and fills its whole storage from `src`.
    ///
    /// Exactly `stride * height` bytes are read. No memory is allocated
    /// beyond the pooled buffer itself.
    ///
    /// # Errors
    ///
    /// As [`get_instance`](Self::get_instance), plus any copy error and
    /// - [`PoolError::NullPointer`] for a null `src`
    /// - [`PoolError::SizeMismatch`] if the buffer's storage is not
    ///   `stride * height` bytes long
    ///
    /// A buffer whose fill failed goes back to the idle queue.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `stride * height` bytes and must not
    /// be written to until this returns.
    pub unsafe fn get_instance_from_ptr(&mut self, src: *const u8) -> Result<B> {
        self.ensure_alive()?;
        if src.is_null() {
            return Err(PoolError::NullPointer);
        }

        let mut buffer = self.checkout()?;
        // SAFETY: `src` is non-null and covers `stride * height` bytes by the
        // caller's contract.
        let result = unsafe { self.filler().from_ptr(&mut buffer, src) };
        self.finish_fill(buffer, result)
    }

    /// Checks out a buffer and fills it from the first `stride * height`
    /// bytes of `src`.
    ///
    /// # Errors
    ///
    /// As [`get_instance`](Self::get_instance), plus
    /// [`PoolError::SizeMismatch`] if `src` is too short.
    pub fn get_instance_from_slice(&mut self, src: &[u8]) -> Result<B> {
        let mut buffer = self.checkout()?;
        let result = self.filler().from_slice(&mut buffer, src);
        self.finish_fill(buffer, result)
    }

    /// Checks out a buffer and copies the pixels of another buffer into it.
    ///
    /// `src` may be a different buffer kind, as long as width, height and
    /// bytes per pixel match. Rows are re-packed when the strides differ.
    ///
    /// # Errors
    ///
    /// As [`get_instance`](Self::get_instance), plus
    /// [`PoolError::ShapeMismatch`] if the layouts differ.
    pub fn get_instance_from_buffer<S: PixelBuffer>(&mut self, src: &S) -> Result<B> {
        self.ensure_alive()?;
        let filler = self.filler();
        filler.check_layout(src.shape())?;

        let mut buffer = self.checkout()?;
        let result = filler.from_rows(&mut buffer, src.pixels(), src.stride());
        self.finish_fill(buffer, result)
    }

    /// Checks out a buffer and fills it with the decoded image at `path`.
    ///
    /// The image is decoded into a temporary bitmap of the pool's shape, which
    /// is dropped before this returns, whether or not the copy succeeded.
    ///
    /// # Errors
    ///
    /// As [`get_instance`](Self::get_instance), plus
    /// - [`PoolError::InvalidPath`] for a blank path or a missing file
    /// - [`PoolError::Decode`] if the file cannot be decoded
    /// - [`PoolError::ShapeMismatch`] if the image has other dimensions
    #[cfg(feature = "decode")]
    pub fn get_instance_from_path(&mut self, path: impl AsRef<Path>) -> Result<B> {
        self.ensure_alive()?;
        let path = path.as_ref();
        crate::decode::check_path(path)?;

        let mut buffer = self.checkout()?;
        let result = self.filler().from_path(&mut buffer, path);
        self.finish_fill(buffer, result)
    }

    /// Returns a buffer to the idle queue.
    ///
    /// Callers must only return buffers this pool handed out, each once.
    /// Debug builds check this and reject violations with
    /// [`PoolError::ForeignBuffer`]. A rejected buffer is dropped.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ShapeMismatch`] if the buffer has another shape
    /// - [`PoolError::Released`] if the pool was released
    pub fn return_instance(&mut self, buffer: B) -> Result<()> {
        self.ensure_alive()?;
        if buffer.shape() != self.shape {
            return Err(PoolError::ShapeMismatch {
                expected: self.shape,
                actual: buffer.shape(),
            });
        }

        #[cfg(debug_assertions)]
        if !self.issued.remove(&(buffer.as_ptr() as usize)) {
            return Err(PoolError::ForeignBuffer);
        }

        self.idle.push_back(buffer);
        trace!(count = self.idle.len(), "buffer returned");
        Ok(())
    }

    /// Disposes every idle buffer and retires the pool.
    ///
    /// Counters, limit and shape are reset to zero. Checked-out buffers are
    /// not tracked and stay with their holders. Every later call fails with
    /// [`PoolError::Released`].
    pub fn release(&mut self) -> Result<()> {
        self.ensure_alive()?;

        let disposed = self.idle.len();
        for buffer in self.idle.drain(..) {
            buffer.dispose();
        }

        self.capacity = 0;
        self.limit = 0;
        self.shape = Shape::default();
        self.palette = None;
        self.alive = false;
        #[cfg(debug_assertions)]
        self.issued.clear();

        debug!(disposed, "buffer pool released");
        Ok(())
    }

    /// Changes the hard ceiling on allocated buffers.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if `limit` is below the number of
    ///   buffers already allocated
    /// - [`PoolError::Released`] if the pool was released
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        self.ensure_alive()?;
        if limit < self.capacity {
            return Err(PoolError::InvalidConfig {
                message: "limit cannot be below the allocated capacity",
            });
        }
        self.limit = limit;
        Ok(())
    }

    /// Returns the number of idle buffers.
    pub fn count(&self) -> usize {
        self.idle.len()
    }

    /// Returns the number of buffers allocated so far, idle or checked out.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the hard ceiling on allocated buffers.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the buffer width, or 0 once released.
    pub fn width(&self) -> u32 {
        self.shape.width
    }

    /// Returns the buffer height, or 0 once released.
    pub fn height(&self) -> u32 {
        self.shape.height
    }

    /// Returns the pixel format, or `Undefined` once released.
    pub fn format(&self) -> PixelFormat {
        self.shape.format
    }

    /// Returns the buffer shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns `false` once the pool has been released.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Returns the palette shared by indexed buffers.
    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    /// Returns the copier used to fill buffers.
    pub fn copier(&self) -> &ParallelCopy {
        &self.copier
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.alive {
            Ok(())
        } else {
            Err(PoolError::Released)
        }
    }

    /// Dequeues an idle buffer or allocates a new one within `limit`.
    fn checkout(&mut self) -> Result<B> {
        self.ensure_alive()?;

        let buffer = match self.idle.pop_front() {
            Some(buffer) => buffer,
            None => {
                if self.capacity == self.limit {
                    debug!(limit = self.limit, "buffer pool exhausted");
                    return Err(PoolError::Exhausted { limit: self.limit });
                }
                self.capacity += 1;
                debug!(capacity = self.capacity, limit = self.limit, "buffer pool grew");
                B::allocate(self.shape, self.palette.as_ref())
            }
        };

        #[cfg(debug_assertions)]
        self.issued.insert(buffer.as_ptr() as usize);

        trace!(count = self.idle.len(), "buffer checked out");
        Ok(buffer)
    }

    /// Puts back a buffer whose fill failed, at the front so it is reused next.
    ///
    /// A released pool disposes it instead.
    pub(super) fn restore(&mut self, buffer: B) {
        if !self.alive {
            buffer.dispose();
            return;
        }
        #[cfg(debug_assertions)]
        self.issued.remove(&(buffer.as_ptr() as usize));
        self.idle.push_front(buffer);
    }

    fn finish_fill<T>(&mut self, buffer: B, result: Result<T>) -> Result<B> {
        match result {
            Ok(_) => Ok(buffer),
            Err(err) => {
                self.restore(buffer);
                Err(err)
            }
        }
    }

    pub(super) fn filler(&self) -> Filler {
        Filler::new(self.shape, self.copier.clone())
    }
}

impl BufferPool<GreyImage> {
    /// Creates a pool of 8-bit greyscale images.
    pub fn with_size(width: u32, height: u32, capacity: usize, limit: usize) -> Result<Self> {
        Self::new(width, height, PixelFormat::Gray8, capacity, limit)
    }
}

impl<B: PixelBuffer> fmt::Debug for BufferPool<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("shape", &self.shape)
            .field("count", &self.idle.len())
            .field("capacity", &self.capacity)
            .field("limit", &self.limit)
            .field("alive", &self.alive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RasterImage;

    fn grey_pool(capacity: usize, limit: usize) -> BufferPool<GreyImage> {
        BufferPool::with_size(8, 4, capacity, limit).unwrap()
    }

    #[test]
    fn test_prewarmed() {
        let pool = grey_pool(3, 5);
        assert_eq!(pool.count(), 3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.limit(), 5);
        assert!(pool.is_alive());
    }

    #[test]
    fn test_unsupported_format() {
        let result = BufferPool::<GreyImage>::new(8, 8, PixelFormat::Rgb24, 1, 2);
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
    }

    #[test]
    fn test_fifo_reuse() {
        let mut pool = grey_pool(0, 3);
        let mut a = pool.get_instance().unwrap();
        let mut b = pool.get_instance().unwrap();
        a.pixels_mut()[0] = 1;
        b.pixels_mut()[0] = 2;

        pool.return_instance(a).unwrap();
        pool.return_instance(b).unwrap();

        // First returned, first reused
        assert_eq!(pool.get_instance().unwrap().pixels()[0], 1);
        assert_eq!(pool.get_instance().unwrap().pixels()[0], 2);
    }

    #[test]
    fn test_failed_fill_restores_buffer() {
        let mut pool = grey_pool(1, 2);
        let result = pool.get_instance_from_slice(&[0u8; 3]);
        assert!(matches!(
            result,
            Err(PoolError::SizeMismatch {
                expected: 32,
                actual: 3
            })
        ));
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.capacity(), 1);
    }

    /// Reports a full-width stride while holding only a few bytes.
    struct Undersized {
        width: u32,
        height: u32,
        data: Vec<u8>,
    }

    impl PixelBuffer for Undersized {
        fn allocate(shape: Shape, _palette: Option<&Arc<Palette>>) -> Self {
            Self {
                width: shape.width,
                height: shape.height,
                data: vec![0u8; 8],
            }
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

    #[test]
    fn test_pointer_fill_checks_real_storage() {
        let mut pool = BufferPool::<Undersized>::new(4096, 64, PixelFormat::Gray8, 0, 2).unwrap();
        let src = vec![7u8; 4096 * 64];

        let result = unsafe { pool.get_instance_from_ptr(src.as_ptr()) };
        assert!(matches!(
            result,
            Err(PoolError::SizeMismatch {
                expected: 262_144,
                actual: 8
            })
        ));
        assert_eq!(pool.count(), 1, "rejected buffer goes back to the queue");

        // The slice path refuses the same buffer too
        assert!(matches!(
            pool.get_instance_from_slice(&src),
            Err(PoolError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_pointer_does_not_check_out() {
        let mut pool = grey_pool(1, 2);
        let result = unsafe { pool.get_instance_from_ptr(std::ptr::null()) };
        assert!(matches!(result, Err(PoolError::NullPointer)));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_indexed_pool_shares_palette() {
        let mut pool = BufferPool::<RasterImage>::new(4, 4, PixelFormat::Indexed8, 2, 4).unwrap();
        let palette = pool.palette().unwrap().clone();
        let a = pool.get_instance().unwrap();
        let b = pool.get_instance().unwrap();
        // Lazily allocated buffers share it too
        let c = pool.get_instance().unwrap();
        for image in [&a, &b, &c] {
            assert!(Arc::ptr_eq(image.palette().unwrap(), &palette));
        }
    }

    #[test]
    fn test_rgb_pool_has_no_palette() {
        let pool = BufferPool::<RasterImage>::new(4, 4, PixelFormat::Rgb24, 1, 2).unwrap();
        assert!(pool.palette().is_none());
    }

    #[test]
    fn test_set_limit() {
        let mut pool = grey_pool(2, 3);
        assert!(pool.set_limit(1).is_err());
        pool.set_limit(2).unwrap();

        let _a = pool.get_instance().unwrap();
        let _b = pool.get_instance().unwrap();
        assert!(matches!(
            pool.get_instance(),
            Err(PoolError::Exhausted { limit: 2 })
        ));

        pool.set_limit(3).unwrap();
        assert!(pool.get_instance().is_ok());
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_return_wrong_shape() {
        let mut pool = grey_pool(1, 2);
        let result = pool.return_instance(GreyImage::new(2, 2));
        assert!(matches!(result, Err(PoolError::ShapeMismatch { .. })));
        assert_eq!(pool.count(), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_foreign_and_double_return_rejected() {
        let mut pool = grey_pool(1, 3);
        assert!(matches!(
            pool.return_instance(GreyImage::new(8, 4)),
            Err(PoolError::ForeignBuffer)
        ));

        let buffer = pool.get_instance().unwrap();
        let copy = buffer.clone();
        pool.return_instance(buffer).unwrap();
        // A clone has its own storage, so it was never issued
        assert!(matches!(
            pool.return_instance(copy),
            Err(PoolError::ForeignBuffer)
        ));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_debug_format() {
        let pool = grey_pool(1, 2);
        let text = format!("{:?}", pool);
        assert!(text.contains("BufferPool"));
        assert!(text.contains("capacity: 1"));
    }
}
