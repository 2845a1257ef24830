//! Fuzz harness for the safe-HTML filter.
//!
//! Exercises the sanitizer with arbitrary byte sequences converted to
//! UTF-8, checking that it never panics, never emits a script element, and
//! that its output is a fixpoint (sanitizing twice changes nothing).

#![no_main]
use libfuzzer_sys::fuzz_target;
use scrim_core::sanitize_markup;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let once = sanitize_markup(input);
    assert!(!once.to_ascii_lowercase().contains("<script"));
    let twice = sanitize_markup(&once);
    assert_eq!(once, twice);
});
