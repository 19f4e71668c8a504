// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-CBC field cipher.
//!
//! Every call to [`FieldCipher::encrypt`] draws a fresh 16-byte IV from the OS
//! RNG, so the same plaintext never produces the same ciphertext twice. Both
//! halves are hex-encoded for storage in JSON records.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// CBC initialization vector length in bytes.
pub const IV_LENGTH: usize = 16;

/// Errors produced by the field cipher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption key must be {expected} hex characters, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encryption key is not valid hex")]
    InvalidKeyEncoding,

    #[error("Encrypted field is not valid hex")]
    InvalidHex,

    #[error("Invalid IV length: expected {IV_LENGTH} bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("Decryption failed")]
    Decryption,

    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// The server-wide 256-bit field encryption key.
///
/// Key bytes are wiped when the value is dropped and never appear in
/// `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LENGTH]);

impl EncryptionKey {
    /// Parse a key from its 64-character hex form.
    pub fn from_hex(value: &str) -> Result<Self, CipherError> {
        let value = value.trim();
        if value.len() != KEY_LENGTH * 2 {
            return Err(CipherError::InvalidKeyLength {
                expected: KEY_LENGTH * 2,
                got: value.len(),
            });
        }

        let mut bytes = [0u8; KEY_LENGTH];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| CipherError::InvalidKeyEncoding)?;
        Ok(Self(bytes))
    }

    /// Generate a random key (tests and key provisioning tooling).
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// An encrypted value: hex IV plus hex ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub iv: String,
    pub content: String,
}

/// Symmetric cipher for individual record fields.
///
/// Holds only the immutable key, so one instance can be shared across
/// requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FieldCipher {
    key: EncryptionKey,
}

impl FieldCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Encrypt a UTF-8 string under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> EncryptedField {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.0.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        EncryptedField {
            iv: hex::encode(iv),
            content: hex::encode(ciphertext),
        }
    }

    /// Decrypt a field produced by [`FieldCipher::encrypt`].
    ///
    /// Fails if either half is not hex, the IV has the wrong length, the
    /// padding does not check out (corrupted data or a different key), or the
    /// result is not UTF-8.
    pub fn decrypt(&self, field: &EncryptedField) -> Result<String, CipherError> {
        let iv_bytes = hex::decode(&field.iv).map_err(|_| CipherError::InvalidHex)?;
        let iv: [u8; IV_LENGTH] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CipherError::InvalidIvLength(iv_bytes.len()))?;
        let ciphertext = hex::decode(&field.content).map_err(|_| CipherError::InvalidHex)?;

        let plaintext = Aes256CbcDec::new(&self.key.0.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::from_hex(TEST_KEY).unwrap())
    }

    #[test]
    fn round_trip_restores_plaintext() {
        let cipher = cipher();
        for plaintext in ["4111111111111111", "", "José Ñúñez", "line with spaces  "] {
            let field = cipher.encrypt(plaintext);
            assert_eq!(cipher.decrypt(&field).unwrap(), plaintext);
        }
    }

    #[test]
    fn encryption_is_randomized() {
        let cipher = cipher();
        let first = cipher.encrypt("123");
        let second = cipher.encrypt("123");

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.content, second.content);
        assert_eq!(cipher.decrypt(&first).unwrap(), "123");
        assert_eq!(cipher.decrypt(&second).unwrap(), "123");
    }

    #[test]
    fn iv_and_content_are_hex() {
        let field = cipher().encrypt("hello");
        assert_eq!(field.iv.len(), IV_LENGTH * 2);
        assert!(field.iv.chars().all(|c| c.is_ascii_hexdigit()));
        // "hello" pads to a single block
        assert_eq!(field.content.len(), 32);
    }

    #[test]
    fn key_must_be_64_hex_chars() {
        assert_eq!(
            EncryptionKey::from_hex("abcd").unwrap_err(),
            CipherError::InvalidKeyLength {
                expected: 64,
                got: 4
            }
        );

        let not_hex = "zz".repeat(32);
        assert_eq!(
            EncryptionKey::from_hex(&not_hex).unwrap_err(),
            CipherError::InvalidKeyEncoding
        );
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = EncryptionKey::from_hex(TEST_KEY).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("0001"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn truncated_content_fails() {
        let cipher = cipher();
        let mut field = cipher.encrypt("4111111111111111");
        field.content.truncate(field.content.len() - 2);

        assert_eq!(cipher.decrypt(&field), Err(CipherError::Decryption));
    }

    #[test]
    fn non_hex_content_fails() {
        let cipher = cipher();
        let mut field = cipher.encrypt("secret");
        field.content = "not-hex".to_string();

        assert_eq!(cipher.decrypt(&field), Err(CipherError::InvalidHex));
    }

    #[test]
    fn short_iv_fails() {
        let cipher = cipher();
        let mut field = cipher.encrypt("secret");
        field.iv = "00ff".to_string();

        assert_eq!(cipher.decrypt(&field), Err(CipherError::InvalidIvLength(2)));
    }

    #[test]
    fn other_key_never_yields_plaintext() {
        let field = cipher().encrypt("4111111111111111");
        let other = FieldCipher::new(EncryptionKey::generate());

        let result = other.decrypt(&field);
        assert!(!matches!(result, Ok(ref p) if p == "4111111111111111"));
    }
}
