// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Field-Level Encryption
//!
//! Sensitive attributes of cards, bank accounts and addresses are encrypted
//! one field at a time with AES-256-CBC under a single server key supplied at
//! start-up. Encrypting per field lets the service show a card's last four
//! digits without ever decrypting its number, and keeps plain fields
//! (country, state) readable.
//!
//! - `cipher` - key parsing, encrypt/decrypt
//! - `sealed` - `(encrypted<Field>, <field>Iv)` codec and accessor macro

pub mod cipher;
pub mod sealed;

pub use cipher::{CipherError, EncryptedField, EncryptionKey, FieldCipher};
