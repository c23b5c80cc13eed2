//! Error types for the cryptographic layer.

use thiserror::Error;
use veilcall_proto::{EnvelopeError, Failure};

/// Errors raised while sealing or opening transaction envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The supplied peer public key is not a well-formed 32-byte point.
    #[error("invalid peer public key: expected 32 bytes, got {len}")]
    InvalidKey {
        /// Length of the rejected key material.
        len: usize,
    },

    /// AEAD authentication failed. The ciphertext was tampered with or the
    /// keys mismatch; the two cases are indistinguishable, so this is
    /// fatal and never retried.
    #[error("aead authentication failed")]
    Decrypt,

    /// The remote reported an application-level failure. This is not a
    /// cryptographic problem and bypasses (outer) or follows (inner)
    /// decryption.
    #[error("call failed: {0}")]
    CallFailure(Failure),

    /// The envelope could not be encoded or decoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}
