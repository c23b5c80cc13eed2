//! Veilcall Client
//!
//! Transparent calldata encryption around a JSON-RPC transport. The
//! dispatcher decides which calls to intercept, seals their calldata under
//! a rotating remote key, forwards them through a caller-supplied
//! [`Transport`], retries once the remote reports a stale key epoch
//! (bounded), and opens read results on the way back.
//!
//! # Components
//!
//! - [`InterceptingDispatcher`]: the intercept/encrypt/submit/decrypt state
//!   machine
//! - [`KeyEpochCache`]: bounded cache of recently observed remote keys
//! - [`Transport`]: seam to the underlying RPC stack, the sole suspension
//!   point per request
//!
//! The dispatcher owns no sockets and spawns no tasks; callers integrate it
//! synchronously or asynchronously without changing the protocol's ordering
//! guarantees.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dispatcher;
mod error;
mod key_cache;
mod transport;

pub use dispatcher::{DispatchConfig, InterceptingDispatcher};
pub use error::ClientError;
pub use key_cache::{CalldataPublicKey, EPOCH_LIMIT, KeyEpochCache};
pub use transport::{RpcError, RpcResponse, Transport, TransportError};
