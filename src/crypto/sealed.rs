// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed-field codec.
//!
//! A sealed field is persisted as two sibling strings on a record:
//! `encrypted<Field>` (hex ciphertext) and `<field>Iv` (hex IV). This module
//! converts between an optional plaintext and that pair, and the
//! [`sealed_fields!`](crate::sealed_fields) macro generates the typed
//! `set_<field>` / `<field>` accessors on each stored record.

use super::{EncryptedField, FieldCipher};

/// Result of opening a sealed pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// One or both halves are missing: the field was never set.
    Unset,
    /// Successfully decrypted value.
    Plain(String),
    /// Both halves exist but could not be decrypted.
    Unreadable,
}

/// Encrypt an optional value into an `(encrypted, iv)` pair.
///
/// `None` and the empty string both clear the field.
pub fn seal(cipher: &FieldCipher, value: Option<&str>) -> (Option<String>, Option<String>) {
    match value {
        Some(plain) if !plain.is_empty() => {
            let EncryptedField { iv, content } = cipher.encrypt(plain);
            (Some(content), Some(iv))
        }
        _ => (None, None),
    }
}

/// Whether both halves of a pair are present.
pub fn is_set(encrypted: Option<&str>, iv: Option<&str>) -> bool {
    encrypted.is_some() && iv.is_some()
}

/// Decrypt an `(encrypted, iv)` pair.
pub fn open(cipher: &FieldCipher, encrypted: Option<&str>, iv: Option<&str>) -> Opened {
    let (Some(content), Some(iv)) = (encrypted, iv) else {
        return Opened::Unset;
    };

    let field = EncryptedField {
        iv: iv.to_string(),
        content: content.to_string(),
    };
    match cipher.decrypt(&field) {
        Ok(plain) => Opened::Plain(plain),
        Err(_) => Opened::Unreadable,
    }
}

/// Decrypt a pair, substituting `fallback` when the data is unreadable.
///
/// Unreadable fields are logged with the field name and record id only.
pub fn open_or(
    cipher: &FieldCipher,
    encrypted: Option<&str>,
    iv: Option<&str>,
    field: &'static str,
    record_id: &str,
    fallback: &str,
) -> Option<String> {
    match open(cipher, encrypted, iv) {
        Opened::Unset => None,
        Opened::Plain(value) => Some(value),
        Opened::Unreadable => {
            tracing::warn!(field, record_id, "Failed to decrypt sealed field, using placeholder");
            Some(fallback.to_string())
        }
    }
}

/// Generate sealed-field accessors on a stored record.
///
/// For each entry `name / set_name => (encrypted_field, iv_field), "fallback"`
/// this produces:
///
/// - `fn name(&self, cipher) -> Option<String>`: decrypted value, `None` when
///   unset, the fallback string when the stored pair cannot be decrypted;
/// - `fn set_name(&mut self, cipher, Option<&str>)`: encrypts a non-empty
///   value into both stored halves, clears both otherwise.
///
/// The record must have an `id: String` field.
#[macro_export]
macro_rules! sealed_fields {
    ($record:ty {
        $( $(#[$meta:meta])* $getter:ident / $setter:ident => ($enc:ident, $iv:ident), $fallback:expr; )+
    }) => {
        impl $record {
            $(
                $(#[$meta])*
                pub fn $getter(&self, cipher: &$crate::crypto::FieldCipher) -> Option<String> {
                    $crate::crypto::sealed::open_or(
                        cipher,
                        self.$enc.as_deref(),
                        self.$iv.as_deref(),
                        stringify!($getter),
                        &self.id,
                        $fallback,
                    )
                }

                #[doc = concat!("Encrypt and store `", stringify!($getter), "`; `None` or empty clears it.")]
                pub fn $setter(&mut self, cipher: &$crate::crypto::FieldCipher, value: Option<&str>) {
                    let (encrypted, iv) = $crate::crypto::sealed::seal(cipher, value);
                    self.$enc = encrypted;
                    self.$iv = iv;
                }
            )+
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKey;

    fn cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::generate())
    }

    #[test]
    fn seal_then_open() {
        let cipher = cipher();
        let (enc, iv) = seal(&cipher, Some("Main Street 1"));
        assert!(enc.is_some() && iv.is_some());

        let opened = open(&cipher, enc.as_deref(), iv.as_deref());
        assert_eq!(opened, Opened::Plain("Main Street 1".to_string()));
    }

    #[test]
    fn empty_or_missing_value_clears() {
        let cipher = cipher();
        assert_eq!(seal(&cipher, None), (None, None));
        assert_eq!(seal(&cipher, Some("")), (None, None));
    }

    #[test]
    fn half_missing_pair_is_unset() {
        let cipher = cipher();
        let (enc, iv) = seal(&cipher, Some("value"));

        assert!(!is_set(enc.as_deref(), None));
        assert!(is_set(enc.as_deref(), iv.as_deref()));
        assert_eq!(open(&cipher, enc.as_deref(), None), Opened::Unset);
        assert_eq!(open(&cipher, None, iv.as_deref()), Opened::Unset);
        assert_eq!(
            open_or(&cipher, enc.as_deref(), None, "city", "rec-1", "Encrypted"),
            None
        );
    }

    #[test]
    fn corrupted_pair_uses_fallback() {
        let cipher = cipher();
        let (_, iv) = seal(&cipher, Some("value"));

        let opened = open_or(&cipher, Some("zz"), iv.as_deref(), "city", "rec-1", "Encrypted");
        assert_eq!(opened.as_deref(), Some("Encrypted"));
    }
}
