#![no_main]

use libfuzzer_sys::fuzz_target;
use rasterpool::{GreyPool, PoolError};

fuzz_target!(|ops: Vec<u8>| {
    let Ok(mut pool) = GreyPool::with_size(8, 8, 2, 6) else {
        return;
    };
    let mut held = Vec::new();

    for op in ops {
        match op % 4 {
            0 => match pool.get_instance() {
                Ok(image) => held.push(image),
                Err(PoolError::Exhausted { limit }) => assert_eq!(limit, pool.capacity()),
                Err(e) => panic!("unexpected checkout error: {e}"),
            },
            1 => {
                if let Some(image) = held.pop() {
                    pool.return_instance(image).unwrap();
                }
            }
            2 => {
                let frame = vec![op; 64];
                match pool.get_instance_from_slice(&frame) {
                    Ok(image) => held.push(image),
                    Err(PoolError::Exhausted { .. }) => {}
                    Err(e) => panic!("unexpected fill error: {e}"),
                }
            }
            _ => {
                let _ = pool.set_limit(usize::from(op % 16));
            }
        }

        // Verify: idle <= allocated <= limit, and nothing is lost
        assert!(pool.count() <= pool.capacity());
        assert!(pool.capacity() <= pool.limit());
        assert_eq!(pool.count() + held.len(), pool.capacity());
    }

    for image in held.drain(..) {
        pool.return_instance(image).unwrap();
    }
    pool.release().unwrap();
});
