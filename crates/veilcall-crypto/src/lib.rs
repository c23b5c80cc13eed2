//! Veilcall Cryptographic Layer
//!
//! Shared-secret derivation and the per-session transaction cipher that
//! seals outbound calldata and opens read results.
//!
//! # Session Lifecycle
//!
//! Each [`SessionCipher`] binds one ephemeral X25519 key pair to one remote
//! calldata public key:
//!
//! ```text
//! Remote calldata key (per epoch)
//!        │
//!        ▼
//! X25519 DH with fresh ephemeral secret
//!        │
//!        ▼
//! HMAC-SHA-512/256 under a fixed domain constant → session key
//!        │
//!        ▼
//! Deoxys-II AEAD → request / result envelopes
//! ```
//!
//! The ephemeral secret is consumed by derivation and never stored; the
//! derived session key lives only as long as the session and is zeroized
//! on drop. A session normally serves exactly one request/response round
//! trip, though repeated `encrypt` calls are sound because every call
//! draws a fresh random nonce.
//!
//! # Security
//!
//! - Forward secrecy: a new ephemeral key pair per session means a later
//!   key compromise exposes no past traffic.
//! - Tamper evidence: AEAD authentication failure is fatal and
//!   indistinguishable from an attack; it is never retried.
//! - Nonce discipline: the (key, nonce) pair never repeats across two
//!   distinct plaintexts.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
mod cipher;
mod derive;
mod error;

pub use cipher::SessionCipher;
pub use derive::{SessionKey, derive_shared_secret};
pub use error::CryptoError;
