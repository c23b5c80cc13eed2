//! Transport seam between the dispatcher and the RPC stack.
//!
//! The dispatcher never talks to the network itself; it hands fully formed
//! method/params pairs to a [`Transport`] and inspects the response. This
//! keeps the protocol logic testable against in-memory transports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Transport errors.
///
/// These are I/O-level failures. RPC-level errors (the remote answered,
/// but with an error object) travel inside [`RpcResponse`] instead, since
/// the dispatcher must inspect them.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(String),
}

/// RPC-level error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Remote error code.
    pub code: i64,
    /// Remote error message.
    pub message: String,
}

/// A JSON-RPC response: a result, an error, or (degenerately) neither.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Successful result, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// RPC-level error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// A successful response.
    pub fn ok(result: Value) -> Self {
        Self { result: Some(result), error: None }
    }

    /// An error response.
    pub fn err(code: i64, message: impl Into<String>) -> Self {
        Self { result: None, error: Some(RpcError { code, message: message.into() }) }
    }
}

/// Asynchronous RPC transport.
///
/// The single `request` call is the dispatcher's only suspension point;
/// cancellation before it has no side effects, and the dispatcher never
/// attempts decryption after a cancelled call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one RPC call and return the remote's response.
    async fn request(&self, method: &str, params: Value) -> Result<RpcResponse, TransportError>;
}
