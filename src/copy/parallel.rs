//! Chunked parallel memory copy.
//!
//! A copy of `size` bytes is split into contiguous, disjoint chunks by
//! [`chunk_ranges`]. Every chunk is spawned as its own task on a rayon thread
//! pool with its range captured by value, so no index is shared between
//! workers. A rayon scope is the barrier: the submitter returns only when no
//! task can touch the destination any more.
//!
//! With [`WaitPolicy::Bounded`] the barrier still joins every task, but tasks
//! that start after the deadline skip their chunk. The copy then reports
//! [`PoolError::CopyTimeout`] with the number of chunks that were written.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{trace, warn};

use crate::config::{CopyConfig, WaitPolicy};
use crate::error::{PoolError, Result};

/// Splits `[0, size)` into `chunks` contiguous ranges.
///
/// Every range is `size / chunks` bytes long except the last, which also
/// takes the remainder. When `size < chunks` all ranges but the last are
/// empty. The ranges are disjoint and their union is exactly `[0, size)`.
///
/// A `chunks` of zero is treated as one.
///
/// # Example
///
/// ```
/// use rasterpool::chunk_ranges;
///
/// let ranges: Vec<_> = chunk_ranges(10, 3).collect();
/// assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
/// ```
pub fn chunk_ranges(size: usize, chunks: usize) -> impl Iterator<Item = Range<usize>> {
    let chunks = chunks.max(1);
    let part = size / chunks;
    (0..chunks).map(move |i| {
        let start = (i * part).min(size);
        let end = if i == chunks - 1 {
            size
        } else {
            (start + part).min(size)
        };
        start..end
    })
}

/// Outcome of a completed copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    /// Bytes copied.
    pub bytes: usize,
    /// Chunks the copy was split into.
    pub chunks: usize,
}

/// Parallel chunked copy of raw memory.
///
/// Work runs on the process-wide rayon pool unless a pool is supplied with
/// [`ParallelCopy::with_thread_pool`]. The thread pool is never owned
/// exclusively; several copies may share it.
///
/// # Example
///
/// ```
/// use rasterpool::ParallelCopy;
///
/// let src: Vec<u8> = (0..10_000).map(|i| i as u8).collect();
/// let mut dst = vec![0u8; src.len()];
///
/// let summary = ParallelCopy::default().copy(&mut dst, &src)?;
/// assert_eq!(summary.bytes, 10_000);
/// assert_eq!(dst, src);
/// # Ok::<(), rasterpool::PoolError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParallelCopy {
    config: CopyConfig,
    thread_pool: Option<Arc<rayon::ThreadPool>>,
}

impl ParallelCopy {
    /// Creates a copier with the given configuration.
    pub fn new(config: CopyConfig) -> Self {
        Self {
            config,
            thread_pool: None,
        }
    }

    /// Creates a copier with [`CopyConfig::legacy`]: 1000 chunks, 200 ms wait.
    pub fn legacy() -> Self {
        Self::new(CopyConfig::legacy())
    }

    /// Runs chunks on `pool` instead of the global rayon pool.
    pub fn with_thread_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Returns the dedicated thread pool, if one was supplied.
    pub fn thread_pool(&self) -> Option<&Arc<rayon::ThreadPool>> {
        self.thread_pool.as_ref()
    }

    /// Returns the number of worker threads chunks are spread across.
    pub fn num_threads(&self) -> usize {
        match &self.thread_pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Copies `src` into `dst`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::SizeMismatch`] if the slices differ in length
    /// - [`PoolError::CopyTimeout`] if a bounded wait expired; `dst` then
    ///   holds a partial copy
    pub fn copy(&self, dst: &mut [u8], src: &[u8]) -> Result<CopySummary> {
        if dst.len() != src.len() {
            return Err(PoolError::SizeMismatch {
                expected: dst.len(),
                actual: src.len(),
            });
        }
        // SAFETY: both slices are valid for `len` bytes, and `dst` is borrowed
        // mutably so it cannot overlap `src`.
        unsafe { self.copy_raw(dst.as_mut_ptr(), src.as_ptr(), src.len()) }
    }

    /// Copies `size` bytes from `src` to `dst`.
    ///
    /// A `size` of zero returns immediately without touching either pointer.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NullPointer`] if either pointer is null and `size > 0`
    /// - [`PoolError::CopyTimeout`] if a bounded wait expired; `dst` then
    ///   holds a partial copy
    ///
    /// # Safety
    ///
    /// - `src` must be valid for reads of `size` bytes
    /// - `dst` must be valid for writes of `size` bytes
    /// - the two regions must not overlap
    /// - neither region may be accessed by anything else until this returns
    pub unsafe fn copy_raw(&self, dst: *mut u8, src: *const u8, size: usize) -> Result<CopySummary> {
        if size == 0 {
            return Ok(CopySummary { bytes: 0, chunks: 0 });
        }
        if dst.is_null() || src.is_null() {
            return Err(PoolError::NullPointer);
        }

        let total = self.config.chunking().chunk_count(size, self.num_threads());
        let deadline = match self.config.wait() {
            WaitPolicy::Block => None,
            WaitPolicy::Bounded(timeout) => Some(Instant::now() + timeout),
        };
        let job = ChunkJob {
            dst: RawDst(dst),
            src: RawSrc(src),
            size,
            total,
            deadline,
        };
        let completed = AtomicUsize::new(0);

        trace!(size, chunks = total, "parallel copy");

        match &self.thread_pool {
            Some(pool) => pool.scope(|scope| job.spawn_all(scope, &completed)),
            None => rayon::scope(|scope| job.spawn_all(scope, &completed)),
        }

        let completed = completed.into_inner();
        if completed < total {
            warn!(completed, total, size, "copy wait expired, destination is partial");
            return Err(PoolError::CopyTimeout { completed, total });
        }

        Ok(CopySummary {
            bytes: size,
            chunks: total,
        })
    }

    /// Copies `row_bytes` bytes of every row from `src` to `dst`, rows in
    /// parallel.
    ///
    /// Used when two buffers share a layout but differ in row padding.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::SizeMismatch`] if a stride is smaller than
    /// `row_bytes` or the slices hold a different number of rows.
    pub fn copy_rows(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        row_bytes: usize,
    ) -> Result<()> {
        if dst_stride < row_bytes || src_stride < row_bytes {
            return Err(PoolError::SizeMismatch {
                expected: row_bytes,
                actual: dst_stride.min(src_stride),
            });
        }
        if dst_stride == 0 || src_stride == 0 {
            return Ok(());
        }
        let rows = dst.len() / dst_stride;
        if src.len() / src_stride != rows {
            return Err(PoolError::SizeMismatch {
                expected: rows * src_stride,
                actual: src.len(),
            });
        }

        let layout = RowLayout {
            rows,
            dst_stride,
            src_stride,
            row_bytes,
        };
        match &self.thread_pool {
            Some(pool) => pool.install(|| layout.copy(dst, src)),
            None => layout.copy(dst, src),
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct RowLayout {
    rows: usize,
    dst_stride: usize,
    src_stride: usize,
    row_bytes: usize,
}

impl RowLayout {
    fn copy(self, dst: &mut [u8], src: &[u8]) {
        let row_bytes = self.row_bytes;
        dst.par_chunks_mut(self.dst_stride)
            .zip(src.par_chunks(self.src_stride))
            .take(self.rows)
            .for_each(|(d, s)| d[..row_bytes].copy_from_slice(&s[..row_bytes]));
    }
}

/// Destination pointer handed to chunk tasks.
#[derive(Clone, Copy)]
struct RawDst(*mut u8);

/// Source pointer handed to chunk tasks.
#[derive(Clone, Copy)]
struct RawSrc(*const u8);

// SAFETY: tasks only dereference these within disjoint ranges, and the
// scope guarantees the caller's regions outlive every task.
unsafe impl Send for RawDst {}
unsafe impl Sync for RawDst {}
unsafe impl Send for RawSrc {}
unsafe impl Sync for RawSrc {}

/// Everything a chunk task needs, captured by value.
#[derive(Clone, Copy)]
struct ChunkJob {
    dst: RawDst,
    src: RawSrc,
    size: usize,
    total: usize,
    deadline: Option<Instant>,
}

impl ChunkJob {
    fn spawn_all<'scope>(self, scope: &rayon::Scope<'scope>, completed: &'scope AtomicUsize) {
        for range in chunk_ranges(self.size, self.total) {
            scope.spawn(move |_| self.run_chunk(range, completed));
        }
    }

    fn run_chunk(self, range: Range<usize>, completed: &AtomicUsize) {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return;
        }
        if !range.is_empty() {
            // SAFETY: `range` lies within `[0, size)` and ranges of distinct
            // chunks are disjoint; validity of both regions is the caller's
            // contract on `copy_raw`.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.src.0.add(range.start),
                    self.dst.0.add(range.start),
                    range.len(),
                );
            }
        }
        completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{Chunking, LEGACY_CHUNK_COUNT};

    fn pattern(size: usize) -> Vec<u8> {
        (0..size).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_chunk_ranges_cover_exactly() {
        for (size, chunks) in [(0, 4), (1, 1000), (999, 1000), (1000, 1000), (1001, 1000), (17, 5)] {
            let ranges: Vec<_> = chunk_ranges(size, chunks).collect();
            assert_eq!(ranges.len(), chunks);
            let mut next = 0;
            for r in &ranges {
                assert_eq!(r.start, next, "gap or overlap at {:?}", r);
                assert!(r.end <= size);
                next = r.end;
            }
            assert_eq!(next, size);
        }
    }

    #[test]
    fn test_chunk_ranges_small_size_degenerates() {
        let ranges: Vec<_> = chunk_ranges(5, LEGACY_CHUNK_COUNT).collect();
        assert!(ranges[..LEGACY_CHUNK_COUNT - 1].iter().all(|r| r.is_empty()));
        assert_eq!(ranges[LEGACY_CHUNK_COUNT - 1], 0..5);
    }

    #[test]
    fn test_chunk_ranges_zero_chunks() {
        let ranges: Vec<_> = chunk_ranges(8, 0).collect();
        assert_eq!(ranges, vec![0..8]);
    }

    #[test]
    fn test_copy_zero_size_ignores_pointers() {
        let copier = ParallelCopy::default();
        let summary = unsafe { copier.copy_raw(std::ptr::null_mut(), std::ptr::null(), 0) }.unwrap();
        assert_eq!(summary, CopySummary { bytes: 0, chunks: 0 });
    }

    #[test]
    fn test_copy_null_pointer() {
        let copier = ParallelCopy::default();
        let src = [1u8; 4];
        let result = unsafe { copier.copy_raw(std::ptr::null_mut(), src.as_ptr(), 4) };
        assert!(matches!(result, Err(PoolError::NullPointer)));
    }

    #[test]
    fn test_copy_size_mismatch() {
        let mut dst = [0u8; 3];
        let result = ParallelCopy::default().copy(&mut dst, &[1, 2]);
        assert!(matches!(
            result,
            Err(PoolError::SizeMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_legacy_copy_small() {
        let src = pattern(999);
        let mut dst = vec![0u8; 999];
        let copier = ParallelCopy::new(CopyConfig::legacy().with_wait(WaitPolicy::Block));
        let summary = copier.copy(&mut dst, &src).unwrap();
        assert_eq!(summary.chunks, LEGACY_CHUNK_COUNT);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
        let copier = ParallelCopy::default().with_thread_pool(pool);
        assert_eq!(copier.num_threads(), 2);
        assert!(copier.thread_pool().is_some());
        assert!(ParallelCopy::default().thread_pool().is_none());

        let src = pattern(300_000);
        let mut dst = vec![0u8; src.len()];
        copier.copy(&mut dst, &src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_bounded_wait_reports_partial_copy() {
        // A single busy worker guarantees most chunks start after the deadline
        let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap());
        let config = CopyConfig::new(
            Chunking::Fixed(64),
            WaitPolicy::Bounded(Duration::from_millis(20)),
        )
        .unwrap();
        let copier = ParallelCopy::new(config).with_thread_pool(pool.clone());

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        pool.spawn(move || {
            started_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(100));
        });
        started_rx.recv().unwrap();

        let src = pattern(64 * 1024);
        let mut dst = vec![0u8; src.len()];
        match copier.copy(&mut dst, &src) {
            Err(PoolError::CopyTimeout { completed, total }) => {
                assert_eq!(total, 64);
                assert!(completed < total);
            }
            other => panic!("expected CopyTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_rows_with_different_strides() {
        // 3 rows of 5 bytes: packed source, destination padded to 8
        let src: Vec<u8> = (0..15).collect();
        let mut dst = vec![0xFFu8; 24];
        ParallelCopy::default().copy_rows(&mut dst, 8, &src, 5, 5).unwrap();

        assert_eq!(&dst[0..5], &[0, 1, 2, 3, 4]);
        assert_eq!(&dst[8..13], &[5, 6, 7, 8, 9]);
        assert_eq!(&dst[16..21], &[10, 11, 12, 13, 14]);
        // Padding untouched
        assert_eq!(&dst[5..8], &[0xFF; 3]);
    }

    #[test]
    fn test_copy_rows_rejects_short_stride() {
        let mut dst = vec![0u8; 8];
        let result = ParallelCopy::default().copy_rows(&mut dst, 4, &[0u8; 8], 4, 5);
        assert!(matches!(result, Err(PoolError::SizeMismatch { .. })));
    }
}
