// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

use super::{StorageError, StorageResult};

/// Default data directory when `DATA_DIR` is not set.
pub const DATA_ROOT: &str = "./data";

/// Longest id accepted as a file name.
const MAX_ID_LEN: usize = 128;

/// Check that an id taken from a request is safe to use as a file name.
///
/// Allows ASCII letters, digits and `_ - . | @` (identity-provider user ids
/// contain `|` and `@`). Rejects `.`, `..`, separators and anything absolute.
pub fn validate_id(id: &str) -> StorageResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '|' | '@'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Users ==========

    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    pub fn user(&self, user_id: &str) -> PathBuf {
        self.users_dir().join(format!("{user_id}.json"))
    }

    // ========== Vault Records ==========

    pub fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }

    pub fn card(&self, card_id: &str) -> PathBuf {
        self.cards_dir().join(format!("{card_id}.json"))
    }

    pub fn bank_accounts_dir(&self) -> PathBuf {
        self.root.join("bank_accounts")
    }

    pub fn bank_account(&self, account_id: &str) -> PathBuf {
        self.bank_accounts_dir().join(format!("{account_id}.json"))
    }

    pub fn addresses_dir(&self) -> PathBuf {
        self.root.join("addresses")
    }

    pub fn address(&self, address_id: &str) -> PathBuf {
        self.addresses_dir().join(format!("{address_id}.json"))
    }

    // ========== Temporary Access Grants ==========

    pub fn access_grants_dir(&self) -> PathBuf {
        self.root.join("access_grants")
    }

    pub fn access_grant(&self, grant_id: &str) -> PathBuf {
        self.access_grants_dir().join(format!("{grant_id}.json"))
    }

    // ========== Support Tickets ==========

    pub fn tickets_dir(&self) -> PathBuf {
        self.root.join("tickets")
    }

    pub fn ticket(&self, ticket_id: &str) -> PathBuf {
        self.tickets_dir().join(format!("{ticket_id}.json"))
    }

    // ========== Audit Log ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date).join("events.jsonl")
    }
}
