//! Shared-secret derivation via X25519 and a keyed hash.

use hmac::{Hmac, Mac};
use sha2::Sha512_256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Protocol-wide domain-separation constant.
///
/// Used as the HMAC key over the raw DH point. The value is part of the
/// wire contract with the remote side; both ends must use it verbatim.
const KDF_DOMAIN: &[u8] = b"MRAE_Box_Deoxys-II-256-128";

/// A derived 32-byte symmetric session key.
///
/// Never persisted or reused across sessions; zeroized on drop.
pub struct SessionKey([u8; 32]);

impl SessionKey {
    /// Raw key bytes for the AEAD.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Derive the symmetric session key from an X25519 exchange.
///
/// Computes the scalar multiplication of `secret` with `peer_public`, then
/// keys the raw point through HMAC-SHA-512/256 under [`KDF_DOMAIN`]. Pure
/// function with no retained state; the DH is symmetric, so both sides
/// derive the same key from their own secret and the other's public key.
pub fn derive_shared_secret(peer_public: &PublicKey, secret: &StaticSecret) -> SessionKey {
    let point = secret.diffie_hellman(peer_public);

    let Ok(mut mac) = Hmac::<Sha512_256>::new_from_slice(KDF_DOMAIN) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(point.as_bytes());

    SessionKey(mac.finalize().into_bytes().into())
}
