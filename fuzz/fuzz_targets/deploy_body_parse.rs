//! Fuzz harness for deployment body parsing.
//!
//! Arbitrary bytes must either parse into a validated request or produce a
//! clean validation error; panics and id zero leaking through are bugs.

#![no_main]
use libfuzzer_sys::fuzz_target;
use scrim_core::DeployRequest;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = DeployRequest::from_json(data) {
        assert!(!request.title.trim().is_empty());
        if let Some(id) = request.component_id {
            assert_ne!(id.get(), 0);
        }
    }
});
