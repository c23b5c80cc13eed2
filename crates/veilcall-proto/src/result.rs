//! Response envelopes: the outer call result and the sealed inner result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    envelope::{NONCE_SIZE, TAG_SIZE},
    errors::EnvelopeError,
};

/// Structured remote failure, carried either on the outer result (plain) or
/// inside the authenticated channel (inner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Remote module that rejected the call.
    pub module: String,
    /// Module-scoped failure code.
    pub code: u64,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "module {} code {}: {message}", self.module, self.code),
            None => write!(f, "module {} code {}", self.module, self.code),
        }
    }
}

/// A sealed payload: ciphertext with appended tag plus the nonce it was
/// sealed under.
///
/// Field order (`data`, `nonce`) is the canonical CBOR key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AeadEnvelope {
    /// Ciphertext with the 16-byte authentication tag appended.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// 15-byte AEAD nonce.
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
}

/// Outer call result: a plain remote failure or a sealed success envelope.
///
/// Exactly one arm is present on the wire; anything else is a shape
/// violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    /// The call succeeded; the payload is still sealed.
    Ok(AeadEnvelope),
    /// The call failed before producing a confidential result.
    Failure(Failure),
}

/// Wire shape of [`CallResult`]. Field order is canonical (`ok`, `failure`).
#[derive(Debug, Serialize, Deserialize)]
struct RawCallResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ok: Option<AeadEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
}

impl CallResult {
    /// Encode to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let raw = match self {
            Self::Ok(envelope) => RawCallResult { ok: Some(envelope.clone()), failure: None },
            Self::Failure(failure) => RawCallResult { ok: None, failure: Some(failure.clone()) },
        };
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&raw, &mut buf)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode an outer call result.
    ///
    /// The top level must be a map carrying exactly one of `failure` or
    /// `ok`; a present `ok` must be a well-formed AEAD envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let raw: RawCallResult = ciborium::de::from_reader(bytes)
            .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        match (raw.failure, raw.ok) {
            (Some(_), Some(_)) => {
                Err(EnvelopeError::UnexpectedShape("both `failure` and `ok` present"))
            },
            (Some(failure), None) => Ok(Self::Failure(failure)),
            (None, Some(envelope)) => {
                if envelope.nonce.len() != NONCE_SIZE {
                    return Err(EnvelopeError::UnexpectedShape("result nonce must be 15 bytes"));
                }
                if envelope.data.len() < TAG_SIZE {
                    return Err(EnvelopeError::UnexpectedShape(
                        "result data shorter than the AEAD tag",
                    ));
                }
                Ok(Self::Ok(envelope))
            },
            (None, None) => Err(EnvelopeError::MissingField("ok")),
        }
    }
}

/// Inner result recovered after opening the sealed success envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerResult {
    /// Application payload bytes.
    Ok(Vec<u8>),
    /// Application-level failure, authenticated by the channel.
    Fail(Failure),
}

/// Wire shape of [`InnerResult`]. Field order is canonical (`ok`, `fail`).
#[derive(Debug, Serialize, Deserialize)]
struct RawInnerResult {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_bytes")]
    ok: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fail: Option<Failure>,
}

/// `serde_bytes` adapter for `Option<Vec<u8>>`.
mod opt_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serde_bytes::serialize(bytes, ser),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let buf: Option<serde_bytes::ByteBuf> = Option::deserialize(de)?;
        Ok(buf.map(serde_bytes::ByteBuf::into_vec))
    }
}

impl InnerResult {
    /// Encode to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let raw = match self {
            Self::Ok(bytes) => RawInnerResult { ok: Some(bytes.clone()), fail: None },
            Self::Fail(failure) => RawInnerResult { ok: None, fail: Some(failure.clone()) },
        };
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&raw, &mut buf)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode an inner result; absence of both arms is a protocol
    /// violation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let raw: RawInnerResult = ciborium::de::from_reader(bytes)
            .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        match (raw.fail, raw.ok) {
            (Some(_), Some(_)) => {
                Err(EnvelopeError::UnexpectedShape("both `fail` and `ok` present"))
            },
            (Some(failure), None) => Ok(Self::Fail(failure)),
            (None, Some(bytes)) => Ok(Self::Ok(bytes)),
            (None, None) => Err(EnvelopeError::MissingField("ok")),
        }
    }
}
