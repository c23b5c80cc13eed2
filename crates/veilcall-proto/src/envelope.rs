//! Request envelope: the outer wire container for encrypted calldata.

use serde::{Deserialize, Serialize};

use crate::errors::EnvelopeError;

/// Envelope format: X25519 key exchange with Deoxys-II-256-128 AEAD.
pub const FORMAT_ENCRYPTED_X25519_DEOXYSII: u64 = 1;

/// AEAD nonce length in bytes.
pub const NONCE_SIZE: usize = 15;

/// AEAD authentication tag length in bytes; always appended to ciphertext.
pub const TAG_SIZE: usize = 16;

/// X25519 public key length in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Body of a request envelope.
///
/// Field declaration order is the canonical CBOR key order
/// (`pk`, `data`, `epoch`, `nonce`); do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Sender's ephemeral X25519 public key (32 bytes).
    #[serde(with = "serde_bytes")]
    pub pk: Vec<u8>,
    /// Sealed calldata: ciphertext with the 16-byte tag appended.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Epoch of the remote key the sender encrypted against.
    ///
    /// Omitted from the map when absent; the remote then checks the
    /// envelope against every key still inside its acceptance window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    /// Fresh random AEAD nonce (15 bytes, never reused under one key).
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
}

/// Outer request envelope, versioned by `format`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Encrypted body plus the metadata needed to open it.
    pub body: RequestBody,
    /// Envelope format discriminator; see
    /// [`FORMAT_ENCRYPTED_X25519_DEOXYSII`].
    pub format: u64,
}

impl RequestEnvelope {
    /// Wrap a body in the current envelope format.
    pub fn new(body: RequestBody) -> Self {
        Self { body, format: FORMAT_ENCRYPTED_X25519_DEOXYSII }
    }

    /// Encode to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode and validate a request envelope.
    ///
    /// Rejects unknown `format` values and malformed key, nonce, or
    /// ciphertext lengths.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Self = ciborium::de::from_reader(bytes)
            .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        if envelope.format != FORMAT_ENCRYPTED_X25519_DEOXYSII {
            return Err(EnvelopeError::UnsupportedFormat(envelope.format));
        }
        if envelope.body.pk.len() != PUBLIC_KEY_SIZE {
            return Err(EnvelopeError::UnexpectedShape("pk must be 32 bytes"));
        }
        if envelope.body.nonce.len() != NONCE_SIZE {
            return Err(EnvelopeError::UnexpectedShape("nonce must be 15 bytes"));
        }
        if envelope.body.data.len() < TAG_SIZE {
            return Err(EnvelopeError::UnexpectedShape("data shorter than the AEAD tag"));
        }
        Ok(envelope)
    }
}

/// Plaintext wrapper around calldata, sealed inside the request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerRequest {
    /// Raw calldata bytes.
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl InnerRequest {
    /// Wrap calldata for sealing.
    pub fn new(calldata: impl Into<Vec<u8>>) -> Self {
        Self { body: calldata.into() }
    }

    /// Encode to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode recovered plaintext back into calldata.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        ciborium::de::from_reader(bytes).map_err(|e| EnvelopeError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body(epoch: Option<u64>) -> RequestBody {
        RequestBody {
            pk: vec![0x01; PUBLIC_KEY_SIZE],
            data: vec![0xAA, 0xBB],
            epoch,
            nonce: vec![0x02; NONCE_SIZE],
        }
    }

    #[test]
    fn encoding_is_canonical() {
        let envelope = RequestEnvelope::new(sample_body(Some(10)));
        let bytes = envelope.to_bytes().unwrap();

        // Hand-computed canonical CBOR: map keys sorted shorter-first,
        // then lexicographic; all byte fields as byte strings.
        let mut expected = vec![0xA2]; // map(2)
        expected.extend(b"\x64body");
        expected.push(0xA4); // map(4)
        expected.extend(b"\x62pk\x58\x20");
        expected.extend([0x01; 32]);
        expected.extend(b"\x64data\x42\xAA\xBB");
        expected.extend(b"\x65epoch\x0A");
        expected.extend(b"\x65nonce\x4F");
        expected.extend([0x02; 15]);
        expected.extend(b"\x66format\x01");

        assert_eq!(bytes, expected);
    }

    #[test]
    fn missing_epoch_is_omitted_from_the_map() {
        let with = RequestEnvelope::new(sample_body(Some(0))).to_bytes().unwrap();
        let without = RequestEnvelope::new(sample_body(None)).to_bytes().unwrap();

        assert!(without.len() < with.len());
        // body map shrinks from 4 entries to 3
        assert_eq!(without[6], 0xA3);

        let decoded = RequestEnvelope::from_bytes(&without).unwrap();
        assert_eq!(decoded.body.epoch, None);
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let envelope = RequestEnvelope::new(sample_body(Some(42)));
        let decoded = RequestEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut envelope = RequestEnvelope::new(sample_body(Some(1)));
        envelope.format = 2;
        let bytes = envelope.to_bytes().unwrap();

        assert_eq!(RequestEnvelope::from_bytes(&bytes), Err(EnvelopeError::UnsupportedFormat(2)));
    }

    #[test]
    fn short_public_key_is_rejected() {
        let mut body = sample_body(None);
        body.pk = vec![0x01; 16];
        let bytes = RequestEnvelope::new(body).to_bytes().unwrap();

        assert!(matches!(
            RequestEnvelope::from_bytes(&bytes),
            Err(EnvelopeError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn data_must_cover_the_tag() {
        let mut body = sample_body(None);
        body.data = vec![0xAA; TAG_SIZE - 1];
        let bytes = RequestEnvelope::new(body).to_bytes().unwrap();

        assert!(matches!(
            RequestEnvelope::from_bytes(&bytes),
            Err(EnvelopeError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn non_map_input_is_a_decode_error() {
        // CBOR unsigned integer 7
        assert!(matches!(RequestEnvelope::from_bytes(&[0x07]), Err(EnvelopeError::Decode(_))));
    }

    #[test]
    fn inner_request_roundtrip() {
        let inner = InnerRequest::new(b"calldata".to_vec());
        let decoded = InnerRequest::from_bytes(&inner.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, inner);
    }
}
