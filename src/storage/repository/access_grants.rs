// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Temporary access grant repository.
//!
//! Grants are stored one per file under `access_grants/`, keyed by grant id.
//! Lookups by token scan the collection; the token itself is never used as a
//! file name.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{paths::validate_id, JsonStorage, StorageError, StorageResult};

/// Purpose of a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Edit the user's cards, bank accounts and addresses.
    #[default]
    EditProfile,
}

/// Mutation kinds a grant can unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantAction {
    Add,
    Edit,
    Delete,
}

impl std::fmt::Display for GrantAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantAction::Add => write!(f, "add"),
            GrantAction::Edit => write!(f, "edit"),
            GrantAction::Delete => write!(f, "delete"),
        }
    }
}

/// What a grant allows. Everything is allowed unless restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissions {
    #[serde(default = "allowed", alias = "can_add")]
    pub can_add: bool,
    #[serde(default = "allowed", alias = "can_edit")]
    pub can_edit: bool,
    #[serde(default = "allowed", alias = "can_delete")]
    pub can_delete: bool,
}

fn allowed() -> bool {
    true
}

impl Default for GrantPermissions {
    fn default() -> Self {
        Self {
            can_add: true,
            can_edit: true,
            can_delete: true,
        }
    }
}

impl GrantPermissions {
    pub fn allows(&self, action: GrantAction) -> bool {
        match action {
            GrantAction::Add => self.can_add,
            GrantAction::Edit => self.can_edit,
            GrantAction::Delete => self.can_delete,
        }
    }
}

/// Temporary access grant as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccessGrant {
    pub id: String,
    /// The user whose records this grant unlocks.
    pub user_id: String,
    /// 64 hex characters.
    pub token: String,
    #[serde(rename = "type")]
    pub grant_type: GrantType,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    #[serde(default)]
    pub permissions: GrantPermissions,
    pub started_at: DateTime<Utc>,
    /// Lifetime in seconds.
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    /// Admin or manager who issued the grant.
    pub issued_by: String,
}

impl StoredAccessGrant {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of consuming a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This call marked the grant used.
    Consumed,
    /// The grant had already been used.
    AlreadyConsumed,
    /// No grant carries this token.
    NotFound,
}

/// Repository for access grant operations.
pub struct AccessGrantRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> AccessGrantRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    fn path(&self, grant_id: &str) -> StorageResult<PathBuf> {
        validate_id(grant_id)?;
        Ok(self.storage.paths().access_grant(grant_id))
    }

    pub fn exists(&self, grant_id: &str) -> bool {
        self.path(grant_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, grant_id: &str) -> StorageResult<StoredAccessGrant> {
        let path = self.path(grant_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Access grant {grant_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, grant: &StoredAccessGrant) -> StorageResult<()> {
        let path = self.path(&grant.id)?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!(
                "Access grant {}",
                grant.id
            )));
        }
        self.storage.write_json(path, grant)
    }

    pub fn list_all(&self) -> StorageResult<Vec<StoredAccessGrant>> {
        self.storage.load_all(self.storage.paths().access_grants_dir())
    }

    /// Find a grant by exact token, used or not.
    pub fn find_by_token(&self, token: &str) -> StorageResult<Option<StoredAccessGrant>> {
        Ok(self.list_all()?.into_iter().find(|grant| grant.token == token))
    }

    /// Find an unused grant with `token` bound to `user_id`.
    pub fn find_unused_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> StorageResult<Option<StoredAccessGrant>> {
        Ok(self.find_by_token(token)?.filter(|grant| grant.user_id == user_id && !grant.used))
    }

    /// Mark the grant carrying `token` used.
    ///
    /// The flag is flipped under the storage write lock, so of two concurrent
    /// calls exactly one observes `Consumed`.
    pub fn consume(&self, token: &str) -> StorageResult<ConsumeOutcome> {
        let Some(grant) = self.find_by_token(token)? else {
            return Ok(ConsumeOutcome::NotFound);
        };

        let path = self.path(&grant.id)?;
        let outcome = self.storage.update_json(&path, |stored: &mut StoredAccessGrant| {
            if stored.used {
                return Ok(ConsumeOutcome::AlreadyConsumed);
            }
            stored.used = true;
            Ok(ConsumeOutcome::Consumed)
        });

        match outcome {
            // Deleted by the sweeper between lookup and update.
            Err(StorageError::NotFound(_)) => Ok(ConsumeOutcome::NotFound),
            other => other,
        }
    }

    /// Delete every grant created before `cutoff`. Returns how many were removed.
    pub fn purge_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        let mut purged = 0;
        for grant in self.list_all()? {
            if grant.created_at < cutoff {
                self.storage.delete(self.path(&grant.id)?)?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}
