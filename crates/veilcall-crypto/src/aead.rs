//! Seal/open wrapper over the Deoxys-II-256-128 AEAD.
//!
//! The cipher construction itself is an external collaborator (the
//! [`deoxys`] crate); this module pins the protocol's key, nonce and tag
//! sizes onto it and normalizes its error into [`CryptoError::Decrypt`].

use deoxys::{
    DeoxysII256,
    aead::{Aead, KeyInit, Payload, generic_array::GenericArray},
};
use veilcall_proto::NONCE_SIZE;

use crate::error::CryptoError;

/// Seal `plaintext` under `key` and `nonce` with associated data `ad`.
///
/// Returns ciphertext with the 16-byte authentication tag appended, never
/// interleaved.
pub fn seal(key: &[u8; 32], nonce: &[u8; NONCE_SIZE], ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = DeoxysII256::new(GenericArray::from_slice(key));

    let Ok(sealed) =
        cipher.encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad: ad })
    else {
        unreachable!("Deoxys-II encryption cannot fail with valid inputs");
    };

    sealed
}

/// Open `ciphertext` (with appended tag) under `key` and `nonce`.
///
/// Fails atomically: authentication failure yields [`CryptoError::Decrypt`]
/// and never partial plaintext.
pub fn open(
    key: &[u8; 32],
    nonce: &[u8; NONCE_SIZE],
    ad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = DeoxysII256::new(GenericArray::from_slice(key));

    cipher
        .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad: ad })
        .map_err(|_| CryptoError::Decrypt)
}

#[cfg(test)]
mod tests {
    use veilcall_proto::TAG_SIZE;

    use super::*;

    const KEY: [u8; 32] = [0x11; 32];
    const NONCE: [u8; NONCE_SIZE] = [0x22; NONCE_SIZE];

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(&KEY, &NONCE, b"", b"calldata");
        let opened = open(&KEY, &NONCE, b"", &sealed).unwrap();

        assert_eq!(opened, b"calldata");
    }

    #[test]
    fn tag_is_appended() {
        let sealed = seal(&KEY, &NONCE, b"", b"calldata");
        assert_eq!(sealed.len(), b"calldata".len() + TAG_SIZE);
    }

    #[test]
    fn empty_plaintext_seals_to_bare_tag() {
        let sealed = seal(&KEY, &NONCE, b"", b"");
        assert_eq!(sealed.len(), TAG_SIZE);
        assert_eq!(open(&KEY, &NONCE, b"", &sealed).unwrap(), b"");
    }

    #[test]
    fn flipping_any_ciphertext_bit_fails_open() {
        let sealed = seal(&KEY, &NONCE, b"", b"calldata");

        // Every bit position, covering both ciphertext and tag bytes.
        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;

                assert_eq!(
                    open(&KEY, &NONCE, b"", &tampered),
                    Err(CryptoError::Decrypt),
                    "bit {bit} of byte {byte} must not verify",
                );
            }
        }
    }

    #[test]
    fn mismatched_associated_data_fails_open() {
        let sealed = seal(&KEY, &NONCE, b"ad", b"calldata");
        assert_eq!(open(&KEY, &NONCE, b"other", &sealed), Err(CryptoError::Decrypt));
    }

    #[test]
    fn wrong_key_fails_open() {
        let sealed = seal(&KEY, &NONCE, b"", b"calldata");
        let wrong = [0x12; 32];
        assert_eq!(open(&wrong, &NONCE, b"", &sealed), Err(CryptoError::Decrypt));
    }
}
