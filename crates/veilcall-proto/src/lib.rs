//! Veilcall Wire Envelopes
//!
//! CBOR envelope types for confidential contract calls. A request wraps
//! AEAD-sealed calldata together with the ephemeral public key and nonce
//! needed to open it; a response carries either a structured remote failure
//! or a sealed result envelope.
//!
//! # Canonical encoding
//!
//! Requests may later be covered by a signature, so encoding must be byte
//! reproducible. Struct fields are declared in RFC 8949 canonical map-key
//! order (shorter keys first, then lexicographic), which makes ciborium's
//! declaration-order map output canonical. Byte fields are CBOR byte
//! strings, never integer arrays.
//!
//! # Invariants
//!
//! - An outer response carries exactly one of `failure` or `ok`.
//! - An inner result carries exactly one of `ok` or `fail`.
//! - Unrecognized `format` values are rejected, never coerced to a
//!   compatible shape.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
mod result;

pub use envelope::{
    FORMAT_ENCRYPTED_X25519_DEOXYSII, InnerRequest, NONCE_SIZE, PUBLIC_KEY_SIZE, RequestBody,
    RequestEnvelope, TAG_SIZE,
};
pub use errors::EnvelopeError;
pub use result::{AeadEnvelope, CallResult, Failure, InnerResult};
