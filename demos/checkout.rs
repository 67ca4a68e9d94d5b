//! Checks buffers out of a pool, fills them and hands them back.
//!
//! Run with:
//!     RUST_LOG=rasterpool=debug cargo run --example checkout

use rasterpool::{PixelBuffer, PixelFormat, PoolConfig, PoolError, ROW_ALIGN, RasterPool};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = PoolConfig::new(640, 480, PixelFormat::Rgb24, 2, 4)?;
    let mut pool = RasterPool::with_config(config)?;
    let stride = pool.shape().aligned_stride(ROW_ALIGN);
    println!("pool of {} buffers, stride {stride}", pool.shape());

    // Simulated camera frames
    let frame_len = stride * pool.height() as usize;
    let mut held = Vec::new();
    for n in 0..5u8 {
        let frame = vec![n; frame_len];
        match pool.get_instance_from_slice(&frame) {
            Ok(image) => {
                println!(
                    "frame {n}: idle {} allocated {}/{}",
                    pool.count(),
                    pool.capacity(),
                    pool.limit()
                );
                held.push(image);
            }
            Err(e @ PoolError::Exhausted { .. }) => println!("frame {n}: dropped ({e})"),
            Err(e) => return Err(e),
        }
    }

    for image in held {
        assert_eq!(image.byte_len(), frame_len);
        pool.return_instance(image)?;
    }
    println!("after returns: idle {}", pool.count());

    pool.release()?;
    println!("released: alive {}", pool.is_alive());
    Ok(())
}
