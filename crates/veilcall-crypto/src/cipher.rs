//! Per-session transaction cipher.

use rand::{RngCore, rngs::OsRng};
use veilcall_proto::{
    CallResult, InnerRequest, InnerResult, NONCE_SIZE, PUBLIC_KEY_SIZE, RequestBody,
    RequestEnvelope,
};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::{
    aead,
    derive::{SessionKey, derive_shared_secret},
    error::CryptoError,
};

/// Encrypts one outbound call and decrypts its result.
///
/// Construction generates a fresh ephemeral key pair and derives the
/// session key against the remote's calldata public key. The ephemeral
/// secret is consumed during construction; only the public half survives,
/// embedded in outgoing envelopes so the remote can derive the same key.
pub struct SessionCipher {
    epoch: Option<u64>,
    ephemeral_public: [u8; PUBLIC_KEY_SIZE],
    key: SessionKey,
}

impl core::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("epoch", &self.epoch)
            .field("ephemeral_public", &self.ephemeral_public)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SessionCipher {
    /// Bind a new session to a remote calldata public key.
    ///
    /// `peer_epoch` is echoed in every request envelope so the remote can
    /// pick the matching key without trial decryption.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKey`] if `peer_public_key` is not exactly 32
    /// bytes.
    pub fn new(peer_public_key: &[u8], peer_epoch: Option<u64>) -> Result<Self, CryptoError> {
        let peer: [u8; PUBLIC_KEY_SIZE] = peer_public_key
            .try_into()
            .map_err(|_| CryptoError::InvalidKey { len: peer_public_key.len() })?;
        let peer = PublicKey::from(peer);

        let secret = StaticSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&secret);
        let key = derive_shared_secret(&peer, &secret);

        // `secret` drops here; x25519-dalek zeroizes it.
        Ok(Self { epoch: peer_epoch, ephemeral_public: *ephemeral_public.as_bytes(), key })
    }

    /// The session's ephemeral public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.ephemeral_public
    }

    /// Epoch of the remote key this session encrypts against.
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Seal calldata into a wire-ready request envelope.
    ///
    /// Draws a fresh random nonce, so output is non-deterministic across
    /// calls even for identical calldata. No private key material appears
    /// in the envelope.
    pub fn encrypt(&self, calldata: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let plaintext = InnerRequest::new(calldata).to_bytes()?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let data = aead::seal(self.key.as_bytes(), &nonce, b"", &plaintext);

        let envelope = RequestEnvelope::new(RequestBody {
            pk: self.ephemeral_public.to_vec(),
            data,
            epoch: self.epoch,
            nonce: nonce.to_vec(),
        });
        Ok(envelope.to_bytes()?)
    }

    /// Open a call result and return the application payload bytes.
    ///
    /// An outer `failure` is a remote application error and is raised as
    /// [`CryptoError::CallFailure`] without touching the AEAD. A tag
    /// verification failure is fatal ([`CryptoError::Decrypt`]); an inner
    /// `fail` is again [`CryptoError::CallFailure`].
    pub fn decrypt(&self, response: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let envelope = match CallResult::from_bytes(response)? {
            CallResult::Failure(failure) => return Err(CryptoError::CallFailure(failure)),
            CallResult::Ok(envelope) => envelope,
        };

        // Length already validated by the codec.
        let nonce: [u8; NONCE_SIZE] = envelope
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Envelope(veilcall_proto::EnvelopeError::UnexpectedShape(
                "result nonce must be 15 bytes",
            )))?;

        let plaintext = aead::open(self.key.as_bytes(), &nonce, b"", &envelope.data)?;

        match InnerResult::from_bytes(&plaintext)? {
            InnerResult::Ok(payload) => Ok(payload),
            InnerResult::Fail(failure) => Err(CryptoError::CallFailure(failure)),
        }
    }
}
