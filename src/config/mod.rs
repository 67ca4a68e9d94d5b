//! Configuration for pools and parallel copies.
//!
//! This module provides types to configure pool shape, growth bounds and how
//! buffers are filled:
//!
//! - [`PoolConfig`] - Buffer shape, pre-warmed capacity and hard limit
//! - [`CopyConfig`] - Chunking strategy and wait policy of the parallel copy
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use rasterpool::{Chunking, CopyConfig, PixelFormat, PoolConfig, WaitPolicy};
//!
//! // 5 pre-warmed 64x64 greyscale buffers, growing up to 10
//! let config = PoolConfig::new(64, 64, PixelFormat::Gray8, 5, 10)?;
//!
//! // Reproduce the fixed 1000-chunk, 200 ms bounded copy
//! let config = config.with_copy_config(CopyConfig::legacy());
//!
//! // Or choose explicitly
//! let copy = CopyConfig::new(Chunking::Fixed(64), WaitPolicy::Bounded(Duration::from_secs(1)))?;
//! # Ok::<(), rasterpool::PoolError>(())
//! ```

use std::time::Duration;

use crate::buffer::{PixelFormat, ROW_ALIGN, Shape};
use crate::error::PoolError;

/// Chunk count of the legacy fixed split.
pub const LEGACY_CHUNK_COUNT: usize = 1000;

/// Wait budget of the legacy bounded copy.
pub const LEGACY_WAIT: Duration = Duration::from_millis(200);

/// Default minimum chunk size for [`Chunking::Auto`] (64 KiB).
pub const DEFAULT_MIN_CHUNK_BYTES: usize = 64 * 1024;

/// Upper bound on chunks per worker thread for [`Chunking::Auto`].
pub const CHUNKS_PER_THREAD: usize = 4;

/// How a copy is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chunking {
    /// Always split into exactly this many chunks, whatever the size.
    Fixed(usize),
    /// Scale the chunk count with the payload and the worker count.
    ///
    /// Chunks are at least `min_chunk_bytes` long (except when the whole
    /// payload is smaller) and there are at most
    /// [`CHUNKS_PER_THREAD`] chunks per worker thread.
    Auto {
        /// Smallest chunk worth handing to a worker.
        min_chunk_bytes: usize,
    },
}

impl Chunking {
    /// Returns the number of chunks a copy of `size` bytes is split into on a
    /// pool of `threads` workers.
    pub fn chunk_count(&self, size: usize, threads: usize) -> usize {
        match *self {
            Chunking::Fixed(n) => n,
            Chunking::Auto { min_chunk_bytes } => {
                let max = threads.max(1) * CHUNKS_PER_THREAD;
                (size / min_chunk_bytes.max(1)).clamp(1, max)
            }
        }
    }
}

impl Default for Chunking {
    fn default() -> Self {
        Chunking::Auto {
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
        }
    }
}

/// How long the submitting thread waits for chunk workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaitPolicy {
    /// Wait until every chunk has been copied.
    #[default]
    Block,
    /// Stop scheduling chunks once the timeout elapses.
    ///
    /// Chunks already running complete; chunks that have not started are
    /// skipped and the copy reports [`PoolError::CopyTimeout`].
    Bounded(Duration),
}

/// Configuration of a [`ParallelCopy`](crate::ParallelCopy).
///
/// The default splits by size and core count and blocks until done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CopyConfig {
    chunking: Chunking,
    wait: WaitPolicy,
}

impl CopyConfig {
    /// Creates a new copy configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if a fixed chunk count or minimum
    /// chunk size is zero, or a bounded wait is zero.
    pub fn new(chunking: Chunking, wait: WaitPolicy) -> Result<Self, PoolError> {
        let config = Self { chunking, wait };
        config.validate()?;
        Ok(config)
    }

    /// The fixed 1000-chunk split with a 200 ms bounded wait.
    ///
    /// # Example
    ///
    /// ```
    /// use rasterpool::{Chunking, CopyConfig, WaitPolicy, LEGACY_WAIT};
    ///
    /// let config = CopyConfig::legacy();
    /// assert_eq!(config.chunking(), Chunking::Fixed(1000));
    /// assert_eq!(config.wait(), WaitPolicy::Bounded(LEGACY_WAIT));
    /// ```
    pub const fn legacy() -> Self {
        Self {
            chunking: Chunking::Fixed(LEGACY_CHUNK_COUNT),
            wait: WaitPolicy::Bounded(LEGACY_WAIT),
        }
    }

    /// Sets the chunking strategy.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_chunking(mut self, chunking: Chunking) -> Self {
        self.chunking = chunking;
        self
    }

    /// Sets the wait policy.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Returns the chunking strategy.
    pub fn chunking(&self) -> Chunking {
        self.chunking
    }

    /// Returns the wait policy.
    pub fn wait(&self) -> WaitPolicy {
        self.wait
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        match self.chunking {
            Chunking::Fixed(0) => {
                return Err(PoolError::InvalidConfig {
                    message: "fixed chunk count must be non-zero",
                });
            }
            Chunking::Auto { min_chunk_bytes: 0 } => {
                return Err(PoolError::InvalidConfig {
                    message: "minimum chunk size must be non-zero",
                });
            }
            _ => {}
        }

        if self.wait == WaitPolicy::Bounded(Duration::ZERO) {
            return Err(PoolError::InvalidConfig {
                message: "bounded wait must be non-zero",
            });
        }

        Ok(())
    }
}

/// Configuration of a [`BufferPool`](crate::BufferPool).
///
/// # Constraints
///
/// - `width` and `height` non-zero
/// - `format` not [`PixelFormat::Undefined`]
/// - `capacity < limit`, so the pool can always grow by at least one buffer
///
/// # Example
///
/// ```
/// use rasterpool::{PixelFormat, PoolConfig};
///
/// let config = PoolConfig::new(640, 480, PixelFormat::Indexed8, 2, 8)?;
/// assert_eq!(config.limit(), 8);
///
/// // capacity must stay strictly below limit
/// assert!(PoolConfig::new(640, 480, PixelFormat::Indexed8, 8, 8).is_err());
/// # Ok::<(), rasterpool::PoolError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    width: u32,
    height: u32,
    format: PixelFormat,
    capacity: usize,
    limit: usize,
    copy: CopyConfig,
}

impl PoolConfig {
    /// Creates a new pool configuration with the default copy configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if any constraint is violated.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        capacity: usize,
        limit: usize,
    ) -> Result<Self, PoolError> {
        let config = Self {
            width,
            height,
            format,
            capacity,
            limit,
            copy: CopyConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the buffer width.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Sets the buffer height.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Sets the pixel format.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the number of buffers allocated up front.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the hard ceiling on allocated buffers.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the copy configuration used to fill buffers.
    pub fn with_copy_config(mut self, copy: CopyConfig) -> Self {
        self.copy = copy;
        self
    }

    /// Returns the buffer width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the buffer height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the number of buffers allocated up front.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the hard ceiling on allocated buffers.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the copy configuration.
    pub fn copy_config(&self) -> &CopyConfig {
        &self.copy
    }

    /// Returns the buffer shape.
    pub fn shape(&self) -> Shape {
        Shape::new(self.width, self.height, self.format)
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use rasterpool::{PixelFormat, PoolConfig};
    ///
    /// let config = PoolConfig::new(8, 8, PixelFormat::Gray8, 1, 2)?.with_width(0);
    /// assert!(config.validate().is_err());
    /// # Ok::<(), rasterpool::PoolError>(())
    /// ```
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.width == 0 || self.height == 0 {
            return Err(PoolError::InvalidConfig {
                message: "width and height must be non-zero",
            });
        }

        if !self.format.is_defined() {
            return Err(PoolError::InvalidConfig {
                message: "pixel format must be defined",
            });
        }

        if self.storage_len().is_none() {
            return Err(PoolError::InvalidConfig {
                message: "buffer size overflows addressable memory",
            });
        }

        if self.capacity == 0 && self.limit == 0 {
            return Err(PoolError::InvalidConfig {
                message: "capacity or limit must be positive",
            });
        }

        if self.capacity >= self.limit {
            return Err(PoolError::InvalidConfig {
                message: "capacity must be strictly less than limit",
            });
        }

        self.copy.validate()
    }

    /// Bytes of one padded buffer, or `None` if it cannot be allocated.
    fn storage_len(&self) -> Option<usize> {
        let align = ROW_ALIGN - 1;
        let stride = (self.width as usize)
            .checked_mul(self.format.bytes_per_pixel())?
            .checked_add(align)?
            & !align;
        stride
            .checked_mul(self.height as usize)
            .filter(|&len| len <= isize::MAX as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_copy_config() {
        let config = CopyConfig::default();
        assert_eq!(
            config.chunking(),
            Chunking::Auto {
                min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES
            }
        );
        assert_eq!(config.wait(), WaitPolicy::Block);
    }

    #[test]
    fn test_invalid_copy_config() {
        assert!(CopyConfig::new(Chunking::Fixed(0), WaitPolicy::Block).is_err());
        assert!(CopyConfig::new(Chunking::Auto { min_chunk_bytes: 0 }, WaitPolicy::Block).is_err());
        assert!(
            CopyConfig::new(Chunking::Fixed(4), WaitPolicy::Bounded(Duration::ZERO)).is_err()
        );
        assert!(CopyConfig::legacy().validate().is_ok());
    }

    #[test]
    fn test_fixed_chunk_count_ignores_size() {
        let chunking = Chunking::Fixed(LEGACY_CHUNK_COUNT);
        assert_eq!(chunking.chunk_count(0, 8), 1000);
        assert_eq!(chunking.chunk_count(10_000_000, 8), 1000);
    }

    #[test]
    fn test_auto_chunk_count() {
        let chunking = Chunking::Auto {
            min_chunk_bytes: 1024,
        };
        // Small payloads stay in one chunk
        assert_eq!(chunking.chunk_count(10, 8), 1);
        assert_eq!(chunking.chunk_count(4096, 8), 4);
        // Capped by worker count
        assert_eq!(chunking.chunk_count(1 << 30, 8), 8 * CHUNKS_PER_THREAD);
        assert_eq!(chunking.chunk_count(1 << 30, 0), CHUNKS_PER_THREAD);
    }

    #[test]
    fn test_pool_config_valid() {
        let config = PoolConfig::new(64, 64, PixelFormat::Gray8, 5, 10).unwrap();
        assert_eq!(config.shape(), Shape::new(64, 64, PixelFormat::Gray8));
        assert_eq!(config.capacity(), 5);
        assert_eq!(config.limit(), 10);
    }

    #[test]
    fn test_pool_config_zero_capacity() {
        assert!(PoolConfig::new(64, 64, PixelFormat::Gray8, 0, 1).is_ok());
    }

    #[test]
    fn test_pool_config_invalid_dimensions() {
        assert!(PoolConfig::new(0, 64, PixelFormat::Gray8, 1, 2).is_err());
        assert!(PoolConfig::new(64, 0, PixelFormat::Gray8, 1, 2).is_err());
    }

    #[test]
    fn test_pool_config_undefined_format() {
        assert!(PoolConfig::new(64, 64, PixelFormat::Undefined, 1, 2).is_err());
    }

    #[test]
    fn test_pool_config_capacity_not_below_limit() {
        assert!(PoolConfig::new(64, 64, PixelFormat::Gray8, 10, 10).is_err());
        assert!(PoolConfig::new(64, 64, PixelFormat::Gray8, 11, 10).is_err());
        assert!(PoolConfig::new(64, 64, PixelFormat::Gray8, 0, 0).is_err());
    }

    #[test]
    fn test_pool_config_oversized_buffer() {
        let result = PoolConfig::new(u32::MAX, u32::MAX, PixelFormat::Rgba32, 0, 1);
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));

        // Caught in validate, not only in new
        let config = PoolConfig::new(8, 8, PixelFormat::Gray8, 0, 1)
            .unwrap()
            .with_width(u32::MAX)
            .with_height(u32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PoolConfig::new(8, 8, PixelFormat::Gray8, 1, 2)
            .unwrap()
            .with_width(16)
            .with_height(32)
            .with_format(PixelFormat::Rgba32)
            .with_capacity(3)
            .with_limit(4)
            .with_copy_config(CopyConfig::legacy());

        assert!(config.validate().is_ok());
        assert_eq!(config.shape(), Shape::new(16, 32, PixelFormat::Rgba32));
        assert_eq!(*config.copy_config(), CopyConfig::legacy());
    }
}
