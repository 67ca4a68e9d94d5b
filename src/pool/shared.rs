//! Mutex-guarded pool for use across threads.

#[cfg(feature = "decode")]
use std::path::Path;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

use super::BufferPool;
use super::fill::Filler;
use crate::buffer::{PixelBuffer, Shape};
use crate::error::{PoolError, Result};

/// A [`BufferPool`] behind a mutex, shareable between threads.
///
/// Checkouts and returns lock the pool briefly. Filling checkouts take the
/// buffer under the lock and copy into it after unlocking, so fills from
/// several threads run side by side. On top of the plain pool operations it
/// offers
/// [`get_instance_timeout`](Self::get_instance_timeout), which waits for
/// another thread to return a buffer instead of failing with
/// [`PoolError::Exhausted`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// use rasterpool::{GreyPool, SharedPool};
///
/// let pool = Arc::new(SharedPool::new(GreyPool::with_size(32, 32, 1, 2)?));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let pool = Arc::clone(&pool);
///         thread::spawn(move || {
///             let image = pool.get_instance_timeout(Duration::from_secs(5)).unwrap();
///             pool.return_instance(image).unwrap();
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert!(pool.capacity() <= 2);
/// # Ok::<(), rasterpool::PoolError>(())
/// ```
pub struct SharedPool<B: PixelBuffer> {
    inner: Mutex<BufferPool<B>>,
    returned: Condvar,
}

impl<B: PixelBuffer> SharedPool<B> {
    /// Wraps a pool.
    pub fn new(pool: BufferPool<B>) -> Self {
        Self {
            inner: Mutex::new(pool),
            returned: Condvar::new(),
        }
    }

    /// Checks out a buffer, failing immediately when exhausted.
    pub fn get_instance(&self) -> Result<B> {
        self.inner.lock().get_instance()
    }

    /// Checks out a buffer, waiting up to `timeout` for one to be returned
    /// when the pool is exhausted.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] if no buffer became available in time
    /// - [`PoolError::Released`] if the pool is, or gets, released
    pub fn get_instance_timeout(&self, timeout: Duration) -> Result<B> {
        let deadline = Instant::now() + timeout;
        let mut pool = self.inner.lock();
        loop {
            match pool.get_instance() {
                Err(PoolError::Exhausted { limit }) => {
                    trace!(limit, "waiting for a returned buffer");
                    if self.returned.wait_until(&mut pool, deadline).timed_out() {
                        return match pool.get_instance() {
                            Err(PoolError::Exhausted { .. }) => Err(PoolError::Exhausted { limit }),
                            other => other,
                        };
                    }
                }
                other => return other,
            }
        }
    }

    /// Checks out a buffer and fills it from `src`.
    ///
    /// See [`BufferPool::get_instance_from_slice`].
    pub fn get_instance_from_slice(&self, src: &[u8]) -> Result<B> {
        self.checkout_and_fill(|_| Ok(()), |filler, buffer| filler.from_slice(buffer, src))
    }

    /// Checks out a buffer and fills it from raw memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`BufferPool::get_instance_from_ptr`].
    pub unsafe fn get_instance_from_ptr(&self, src: *const u8) -> Result<B> {
        self.checkout_and_fill(
            |_| {
                if src.is_null() {
                    Err(PoolError::NullPointer)
                } else {
                    Ok(())
                }
            },
            // SAFETY: forwarded caller contract.
            |filler, buffer| unsafe { filler.from_ptr(buffer, src) },
        )
    }

    /// Checks out a buffer and copies another buffer into it.
    ///
    /// See [`BufferPool::get_instance_from_buffer`].
    pub fn get_instance_from_buffer<S: PixelBuffer>(&self, src: &S) -> Result<B> {
        self.checkout_and_fill(
            |filler| filler.check_layout(src.shape()),
            |filler, buffer| filler.from_rows(buffer, src.pixels(), src.stride()),
        )
    }

    /// Checks out a buffer filled with a decoded image file.
    ///
    /// Decoding runs outside the lock too. See
    /// [`BufferPool::get_instance_from_path`].
    #[cfg(feature = "decode")]
    pub fn get_instance_from_path(&self, path: impl AsRef<Path>) -> Result<B> {
        let path = path.as_ref();
        self.checkout_and_fill(
            |_| crate::decode::check_path(path),
            |filler, buffer| filler.from_path(buffer, path),
        )
    }

    /// Returns a buffer and wakes one waiting thread.
    pub fn return_instance(&self, buffer: B) -> Result<()> {
        self.inner.lock().return_instance(buffer)?;
        self.returned.notify_one();
        Ok(())
    }

    /// Releases the pool and wakes every waiting thread.
    pub fn release(&self) -> Result<()> {
        let result = self.inner.lock().release();
        self.returned.notify_all();
        result
    }

    /// Returns the number of idle buffers.
    pub fn count(&self) -> usize {
        self.inner.lock().count()
    }

    /// Returns the number of buffers allocated so far.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Returns the hard ceiling on allocated buffers.
    pub fn limit(&self) -> usize {
        self.inner.lock().limit()
    }

    /// Returns the buffer shape.
    pub fn shape(&self) -> Shape {
        self.inner.lock().shape()
    }

    /// Returns `false` once the pool has been released.
    pub fn is_alive(&self) -> bool {
        self.inner.lock().is_alive()
    }

    /// Locks the pool for a sequence of operations.
    ///
    /// Threads blocked in [`get_instance_timeout`](Self::get_instance_timeout)
    /// are not woken by returns made through the guard.
    pub fn lock(&self) -> MutexGuard<'_, BufferPool<B>> {
        self.inner.lock()
    }

    /// Unwraps the pool.
    pub fn into_inner(self) -> BufferPool<B> {
        self.inner.into_inner()
    }

    /// Runs `check` and takes a buffer under the lock, then fills it unlocked.
    ///
    /// A buffer whose fill failed is put back under the lock.
    fn checkout_and_fill(
        &self,
        check: impl FnOnce(&Filler) -> Result<()>,
        fill: impl FnOnce(&Filler, &mut B) -> Result<()>,
    ) -> Result<B> {
        let (mut buffer, filler) = {
            let mut pool = self.inner.lock();
            if !pool.is_alive() {
                return Err(PoolError::Released);
            }
            let filler = pool.filler();
            check(&filler)?;
            (pool.get_instance()?, filler)
        };

        match fill(&filler, &mut buffer) {
            Ok(()) => Ok(buffer),
            Err(err) => {
                self.inner.lock().restore(buffer);
                self.returned.notify_one();
                Err(err)
            }
        }
    }
}
