//! Error types for envelope encoding and decoding.

use thiserror::Error;

/// Errors raised by the envelope codec.
///
/// Shape violations are deliberately distinct from crypto failures: a
/// malformed envelope is a protocol bug or a hostile peer, not a key
/// mismatch, and callers must not retry it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// CBOR serialization failed.
    #[error("cbor encode failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed (including non-map top level).
    #[error("cbor decode failed: {0}")]
    Decode(String),

    /// The envelope carries a `format` value this codec does not speak.
    #[error("unsupported envelope format: {0}")]
    UnsupportedFormat(u64),

    /// A required field is absent.
    #[error("envelope is missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present but violates the wire contract.
    #[error("envelope shape violation: {0}")]
    UnexpectedShape(&'static str),
}
