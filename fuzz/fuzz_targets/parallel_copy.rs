#![no_main]

use libfuzzer_sys::fuzz_target;
use rasterpool::{Chunking, CopyConfig, ParallelCopy, WaitPolicy, chunk_ranges};

fuzz_target!(|input: (u16, Vec<u8>)| {
    let (chunks, data) = input;
    let chunks = usize::from(chunks).max(1);

    // Verify: ranges tile [0, len) in order
    let mut next = 0;
    for range in chunk_ranges(data.len(), chunks) {
        assert_eq!(range.start, next);
        assert!(range.end >= range.start);
        next = range.end;
    }
    assert_eq!(next, data.len());

    // Verify: every byte lands, including the last one
    let config = CopyConfig::new(Chunking::Fixed(chunks), WaitPolicy::Block).unwrap();
    let mut dst = vec![0u8; data.len()];
    let summary = ParallelCopy::new(config).copy(&mut dst, &data).unwrap();
    assert_eq!(summary.bytes, data.len());
    assert_eq!(dst, data);
});
