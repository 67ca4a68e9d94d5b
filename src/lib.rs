//! rasterpool
//!
//! Bounded pools of fixed-shape raster buffers for Rust.
//!
//! Allocating large image buffers on every frame is expensive. `rasterpool`
//! pre-allocates buffers of one shape, grows on demand up to a hard limit,
//! and hands idle buffers out again first-in first-out. Buffers can be filled
//! on checkout from raw memory, a slice, another buffer or an image file,
//! through a chunked parallel copy that needs no intermediate allocation.
//!
//! The crate intentionally:
//! - does NOT interpret pixel content
//! - does NOT render or encode images
//! - does NOT own the worker threads it copies on
//!
//! # Pool
//!
//! ```
//! use rasterpool::{PixelBuffer, PixelFormat, PoolError, RasterPool};
//!
//! fn main() -> Result<(), PoolError> {
//!     let mut pool = RasterPool::new(64, 64, PixelFormat::Gray8, 5, 10)?;
//!
//!     let frame: Vec<u8> = vec![7; 64 * 64];
//!     let image = pool.get_instance_from_slice(&frame)?;
//!     assert!(image.pixels().iter().all(|&b| b == 7));
//!
//!     pool.return_instance(image)?;
//!     pool.release()?;
//!     Ok(())
//! }
//! ```
//!
//! # Parallel copy
//!
//! ```
//! use rasterpool::{CopyConfig, ParallelCopy};
//!
//! let src = vec![1u8; 1_000_000];
//! let mut dst = vec![0u8; 1_000_000];
//!
//! // 1000 fixed chunks with a 200 ms bounded wait
//! ParallelCopy::new(CopyConfig::legacy()).copy(&mut dst, &src)?;
//! assert_eq!(dst, src);
//! # Ok::<(), rasterpool::PoolError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod copy;
mod error;
mod pool;

#[cfg(feature = "decode")]
mod decode;

//
// Public surface
//

pub use buffer::{
    GreyImage, PALETTE_LEN, Palette, PixelBuffer, PixelFormat, ROW_ALIGN, RasterImage, Shape,
};
pub use config::{
    CHUNKS_PER_THREAD, Chunking, CopyConfig, DEFAULT_MIN_CHUNK_BYTES, LEGACY_CHUNK_COUNT,
    LEGACY_WAIT, PoolConfig, WaitPolicy,
};
pub use copy::{CopySummary, ParallelCopy, chunk_ranges};
pub use error::{PoolError, Result};
pub use pool::{BufferPool, GreyPool, RasterPool, SharedPool};
