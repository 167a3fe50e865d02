//! Fuzz target: `LineAssembler::push`
//!
//! Console bytes arrive one at a time from the UART.  No input may panic
//! the assembler, and no completed line may exceed the line cap or contain
//! a terminator.
//!
//! cargo fuzz run fuzz_line_assembler

#![no_main]

use chipscope::adapters::console::{LineAssembler, MAX_LINE_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut asm = LineAssembler::new();
    for &b in data {
        if let Some(line) = asm.push(b) {
            assert!(!line.contains(['\r', '\n']));
            // Lossy decoding can widen invalid bytes to U+FFFD.
            assert!(line.chars().count() <= MAX_LINE_LEN);
        }
        assert!(asm.pending() <= MAX_LINE_LEN);
    }
});
