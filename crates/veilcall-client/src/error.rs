//! Error types for the client layer.

use thiserror::Error;
use veilcall_crypto::CryptoError;

use crate::transport::TransportError;

/// Errors surfaced by the intercepting dispatcher.
///
/// Only the stale-key condition is handled internally (bounded retry with a
/// key refresh); everything here propagates to the caller unmodified and
/// immediately.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No calldata public key could be obtained from cache or remote.
    #[error("no encryption key available")]
    NoEncryptionKey,

    /// The remote kept rejecting our key epoch past the retry budget.
    #[error("stale key retries exhausted after {attempts} attempts")]
    RetryExhausted {
        /// Number of retries performed before giving up.
        attempts: u32,
    },

    /// Call parameters violate the RPC shape this dispatcher understands.
    #[error("invalid call parameters: {0}")]
    InvalidParams(String),

    /// The fetched calldata public key could not be parsed.
    #[error("malformed calldata public key: {0}")]
    MalformedKey(String),

    /// Envelope or cipher failure; see [`CryptoError`].
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Transport failure, passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
