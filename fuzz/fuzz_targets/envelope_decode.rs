//! Fuzz target for envelope decoding.
//!
//! # Invariants
//!
//! - Decoding completes quickly (no infinite loops)
//! - Huge claimed CBOR lengths are rejected, not allocated
//! - NEVER panic on malformed input

#![no_main]

use libfuzzer_sys::fuzz_target;
use veilcall_proto::{CallResult, InnerRequest, InnerResult, RequestEnvelope};

fuzz_target!(|data: &[u8]| {
    let _ = RequestEnvelope::from_bytes(data);
    let _ = InnerRequest::from_bytes(data);
    let _ = CallResult::from_bytes(data);
    let _ = InnerResult::from_bytes(data);
});
