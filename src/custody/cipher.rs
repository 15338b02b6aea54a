// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated encryption of custodial signing keys at rest.
//!
//! ## Blob Layout
//!
//! ```text
//! base64( nonce[12] || tag[16] || ciphertext[..] )
//! ```
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the system RNG,
//! so a nonce is never reused under the same key. [`decrypt`] splits the blob
//! by fixed offsets and fails closed: if the tag does not verify, no
//! plaintext is returned.

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Nonce length in bytes (96 bits).
pub const NONCE_LENGTH: usize = NONCE_LEN;

/// Authentication tag length in bytes (128 bits).
pub const TAG_LENGTH: usize = 16;

/// Symmetric key length in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Errors raised by key custody.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key must be exactly 32 bytes (64 hex characters), got {0} characters")]
    InvalidKeyLength(usize),

    #[error("encryption key is not valid hex: {0}")]
    InvalidKeyEncoding(String),

    #[error("encrypted secret is malformed: {0}")]
    MalformedBlob(String),

    #[error("encrypted secret failed authentication")]
    Authentication,

    #[error("system random number generator failed")]
    Rng,

    #[error("encryption failed")]
    Seal,
}

/// Encrypt `secret` under a 32-byte key and return the base64 blob.
pub fn encrypt(secret: &[u8], key: &[u8]) -> Result<String, CryptoError> {
    let sealing_key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| CryptoError::Rng)?;

    let mut ciphertext = secret.to_vec();
    let tag = sealing_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| CryptoError::Seal)?;

    let mut blob = Vec::with_capacity(NONCE_LENGTH + TAG_LENGTH + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(tag.as_ref());
    blob.extend_from_slice(&ciphertext);

    Ok(Base64::encode_string(&blob))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// The returned buffer is wiped when dropped.
pub fn decrypt(blob: &str, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let opening_key = aead_key(key)?;

    let raw = Base64::decode_vec(blob.trim())
        .map_err(|e| CryptoError::MalformedBlob(format!("invalid base64: {e}")))?;
    if raw.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(CryptoError::MalformedBlob(format!(
            "expected at least {} bytes, got {}",
            NONCE_LENGTH + TAG_LENGTH,
            raw.len()
        )));
    }

    let (nonce_bytes, rest) = raw.split_at(NONCE_LENGTH);
    let (tag, ciphertext) = rest.split_at(TAG_LENGTH);

    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| CryptoError::MalformedBlob("invalid nonce".to_string()))?;

    // ring expects ciphertext || tag
    let mut in_out = Zeroizing::new(Vec::with_capacity(ciphertext.len() + TAG_LENGTH));
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let plaintext_len = opening_key
        .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| CryptoError::Authentication)?
        .len();

    Ok(Zeroizing::new(in_out[..plaintext_len].to_vec()))
}

/// Parse a 64-character hex key into raw bytes.
pub fn parse_hex_key(hex_key: &str) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CryptoError> {
    let trimmed = hex_key.trim();
    if trimmed.len() != KEY_LENGTH * 2 {
        return Err(CryptoError::InvalidKeyLength(trimmed.len()));
    }

    let decoded = Zeroizing::new(
        alloy::hex::decode(trimmed).map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?,
    );

    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    key.copy_from_slice(&decoded);
    Ok(key)
}

fn aead_key(key: &[u8]) -> Result<LessSafeKey, CryptoError> {
    if key.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength(key.len() * 2));
    }
    let unbound =
        UnboundKey::new(&AES_256_GCM, key).map_err(|_| CryptoError::InvalidKeyLength(key.len() * 2))?;
    Ok(LessSafeKey::new(unbound))
}

/// Key custody bound to the configured hex encryption key.
///
/// The key is parsed on every call rather than at construction, so a
/// malformed `ENCRYPTION_KEY` only fails the operations that need it.
#[derive(Clone)]
pub struct KeyCustody {
    hex_key: Zeroizing<String>,
}

impl KeyCustody {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self {
            hex_key: Zeroizing::new(hex_key.into()),
        }
    }

    /// Encrypt a secret with the configured key.
    pub fn encrypt_secret(&self, secret: &[u8]) -> Result<String, CryptoError> {
        let key = parse_hex_key(&self.hex_key)?;
        encrypt(secret, key.as_ref())
    }

    /// Decrypt a stored blob with the configured key.
    pub fn decrypt_secret(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let key = parse_hex_key(&self.hex_key)?;
        decrypt(blob, key.as_ref())
    }
}

impl std::fmt::Debug for KeyCustody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCustody").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn test_key() -> Zeroizing<[u8; KEY_LENGTH]> {
        parse_hex_key(TEST_KEY_HEX).unwrap()
    }

    #[test]
    fn round_trip_recovers_secret() {
        let key = test_key();
        let secrets: [&[u8]; 3] = [
            b"",
            b"x",
            b"a much longer secret that spans several AES blocks......",
        ];
        for secret in secrets {
            let blob = encrypt(secret, key.as_ref()).unwrap();
            let plain = decrypt(&blob, key.as_ref()).unwrap();
            assert_eq!(plain.as_slice(), secret);
        }
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let key = test_key();
        let one = encrypt(b"same secret", key.as_ref()).unwrap();
        let two = encrypt(b"same secret", key.as_ref()).unwrap();
        assert_ne!(one, two);

        let raw_one = Base64::decode_vec(&one).unwrap();
        let raw_two = Base64::decode_vec(&two).unwrap();
        assert_ne!(raw_one[..NONCE_LENGTH], raw_two[..NONCE_LENGTH]);
    }

    #[test]
    fn blob_layout_is_nonce_tag_ciphertext() {
        let key = test_key();
        let blob = encrypt(b"0123456789", key.as_ref()).unwrap();
        let raw = Base64::decode_vec(&blob).unwrap();
        assert_eq!(raw.len(), NONCE_LENGTH + TAG_LENGTH + 10);
    }

    #[test]
    fn flipped_tag_bit_always_fails_closed() {
        let key = test_key();
        let blob = encrypt(b"signing key material", key.as_ref()).unwrap();
        let raw = Base64::decode_vec(&blob).unwrap();

        for byte in NONCE_LENGTH..NONCE_LENGTH + TAG_LENGTH {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&Base64::encode_string(&tampered), key.as_ref());
                assert!(
                    matches!(result, Err(CryptoError::Authentication)),
                    "byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let blob = encrypt(b"signing key material", key.as_ref()).unwrap();
        let mut raw = Base64::decode_vec(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let result = decrypt(&Base64::encode_string(&raw), key.as_ref());
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn wrong_key_fails() {
        let blob = encrypt(b"secret", test_key().as_ref()).unwrap();
        let other = [7u8; KEY_LENGTH];
        assert!(matches!(
            decrypt(&blob, &other),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        assert!(matches!(
            encrypt(b"secret", &[0u8; 16]),
            Err(CryptoError::InvalidKeyLength(32))
        ));
        assert!(matches!(
            parse_hex_key("abcd"),
            Err(CryptoError::InvalidKeyLength(4))
        ));
        let not_hex = "zz".repeat(KEY_LENGTH);
        assert!(matches!(
            parse_hex_key(&not_hex),
            Err(CryptoError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn short_or_garbage_blob_is_malformed() {
        let key = test_key();
        assert!(matches!(
            decrypt("AAAA", key.as_ref()),
            Err(CryptoError::MalformedBlob(_))
        ));
        assert!(matches!(
            decrypt("not base64 at all!", key.as_ref()),
            Err(CryptoError::MalformedBlob(_))
        ));
    }

    #[test]
    fn custody_defers_key_validation_to_first_use() {
        let custody = KeyCustody::new("too-short");
        assert!(matches!(
            custody.encrypt_secret(b"secret"),
            Err(CryptoError::InvalidKeyLength(_))
        ));

        let custody = KeyCustody::new(TEST_KEY_HEX);
        let blob = custody.encrypt_secret(b"secret").unwrap();
        assert_eq!(custody.decrypt_secret(&blob).unwrap().as_slice(), b"secret");
    }
}
