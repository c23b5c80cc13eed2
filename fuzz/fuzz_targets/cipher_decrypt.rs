//! Fuzz target for the session cipher's decrypt path.
//!
//! # Invariants
//!
//! - Arbitrary response bytes never panic the cipher
//! - Without the session key, no input ever decrypts to plaintext

#![no_main]

use libfuzzer_sys::fuzz_target;
use veilcall_crypto::SessionCipher;

fuzz_target!(|data: &[u8]| {
    // Fixed peer key: the fuzzer cannot know the derived session key, so
    // every authenticated open must fail.
    let Ok(cipher) = SessionCipher::new(&[0x42u8; 32], Some(1)) else {
        unreachable!();
    };

    if let Ok(plaintext) = cipher.decrypt(data) {
        panic!("forged plaintext from arbitrary bytes: {plaintext:x?}");
    }
});
