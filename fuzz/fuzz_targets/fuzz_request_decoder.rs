//! Fuzz target: `RequestDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming request-head decoder
//! and asserts that it never panics, never holds more than the head cap
//! without failing, and only yields requests with an absolute path.
//!
//! cargo fuzz run fuzz_request_decoder

#![no_main]

use chipscope::web::codec::{MAX_HEAD_SIZE, RequestDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = RequestDecoder::new();

    // Feed in uneven slices so split terminators are exercised.
    let mut fed = 0;
    for chunk in data.chunks(7) {
        fed += chunk.len();
        match decoder.feed(chunk) {
            Ok(None) => assert!(fed <= MAX_HEAD_SIZE, "decoder buffered past the head cap"),
            Ok(Some(req)) => {
                assert!(req.path.starts_with('/'));
                break;
            }
            Err(_) => break,
        }
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
