// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account PIN hashing and verification.
//!
//! The account PIN re-authenticates a user before card secrets are revealed.
//! It is stored as an Argon2id PHC string; the plaintext is never persisted.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

pub const MIN_PIN_DIGITS: usize = 4;
pub const MAX_PIN_DIGITS: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinError {
    #[error("PIN must be {MIN_PIN_DIGITS} to {MAX_PIN_DIGITS} digits")]
    InvalidFormat,

    #[error("PIN hashing failed: {0}")]
    Hash(String),
}

/// Check the PIN is 4 to 6 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), PinError> {
    let valid = (MIN_PIN_DIGITS..=MAX_PIN_DIGITS).contains(&pin.len())
        && pin.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(PinError::InvalidFormat)
    }
}

/// Validate and hash a PIN with Argon2id and a random salt.
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    validate_pin(pin)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| PinError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a PIN against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; an unparseable hash is an error.
pub fn verify_pin(pin: &str, hash: &str) -> Result<bool, PinError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PinError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(pin.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PinError::Hash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_pin("482915").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_pin("482915", &hash).unwrap());
        assert!(!verify_pin("482916", &hash).unwrap());
    }

    #[test]
    fn pin_format_is_enforced() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("123456").is_ok());
        assert_eq!(validate_pin("123"), Err(PinError::InvalidFormat));
        assert_eq!(validate_pin("1234567"), Err(PinError::InvalidFormat));
        assert_eq!(validate_pin("12a4"), Err(PinError::InvalidFormat));
        assert_eq!(hash_pin("abcd"), Err(PinError::InvalidFormat));
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches!(verify_pin("1234", "not-a-hash"), Err(PinError::Hash(_))));
    }
}
