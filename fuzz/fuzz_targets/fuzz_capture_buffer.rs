//! Fuzz target: `CaptureBuffer::append_bytes`
//!
//! The first byte picks the capacity; the rest is cut into chunks whose
//! lengths come from the data itself.  After every append the stored
//! bytes must be the longest prefix of the input seen so far that fits.
//!
//! cargo fuzz run fuzz_capture_buffer

#![no_main]

use chipscope::app::capture::{AppendOutcome, CaptureBuffer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&cap, mut rest)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap) + 1;
    let mut buf = CaptureBuffer::new(capacity);
    let mut all: Vec<u8> = Vec::new();

    while let Some((&len, tail)) = rest.split_first() {
        let take = usize::from(len % 64).min(tail.len());
        let (chunk, next) = tail.split_at(take);
        rest = next;

        let before = buf.len();
        let outcome = buf.append_bytes(chunk);
        all.extend_from_slice(chunk);

        let expect = all.len().min(capacity - 1);
        assert_eq!(buf.len(), expect);
        assert_eq!(buf.contents(), &all[..expect]);
        match outcome {
            AppendOutcome::Accepted => assert_eq!(buf.len(), before + chunk.len()),
            AppendOutcome::Truncated { kept, dropped } => assert_eq!(kept + dropped, chunk.len()),
            AppendOutcome::Rejected { dropped } => assert_eq!(dropped, chunk.len()),
        }
    }

    buf.reset();
    assert!(buf.is_empty());
    assert!(!buf.was_truncated());
});
