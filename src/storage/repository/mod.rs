// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to JSON storage.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using [`JsonStorage`](super::JsonStorage) for all file operations.

pub mod access_grants;
pub mod addresses;
pub mod bank_accounts;
pub mod cards;
pub mod tickets;
pub mod users;

pub use access_grants::{
    AccessGrantRepository, ConsumeOutcome, GrantAction, GrantPermissions, GrantType,
    StoredAccessGrant,
};
pub use addresses::{AddressRepository, StoredAddress};
pub use bank_accounts::{BankAccountRepository, StoredBankAccount};
pub use cards::{CardRepository, StoredCard};
pub use tickets::{StoredTicket, TicketRepository, TicketStatus};
pub use users::{StoredUser, UserRepository};

/// Normalize a plain (unencrypted) optional field: empty means unset.
pub(crate) fn plain(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Apply a partial-update value to a plain field.
///
/// `None` leaves the field untouched; `Some("")` clears it.
pub(crate) fn apply_plain(field: &mut Option<String>, update: Option<&str>) {
    if let Some(value) = update {
        *field = plain(Some(value));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::crypto::{EncryptionKey, FieldCipher};

    pub fn test_cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::generate())
    }

    /// Write `victim.json` outside any data directory.
    ///
    /// Returns the directory guard, the id that would name the file through
    /// `Path::join` (absolute, no extension) and the file itself.
    pub fn outside_record(body: serde_json::Value) -> (TempDir, String, PathBuf) {
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.json");
        std::fs::write(&victim, body.to_string()).unwrap();
        let id = outside.path().join("victim").display().to_string();
        (outside, id, victim)
    }

    /// Fail if any key in `value` looks like ciphertext or an IV.
    pub fn assert_no_sealed_keys(value: &serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, nested) in map {
                    let lower = key.to_lowercase();
                    assert!(
                        !lower.starts_with("encrypted")
                            && !key.ends_with("Iv")
                            && !lower.ends_with("_iv")
                            && lower != "iv",
                        "sealed key {key} leaked into a client view"
                    );
                    assert_no_sealed_keys(nested);
                }
            }
            serde_json::Value::Array(items) => items.iter().for_each(assert_no_sealed_keys),
            _ => {}
        }
    }
}
