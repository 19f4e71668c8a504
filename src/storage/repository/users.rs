// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile repository.
//!
//! Profiles are created lazily the first time a user sets a PIN or is given
//! a role. Identity itself lives with the external identity provider.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{paths::validate_id, JsonStorage, StorageError, StorageResult};
use crate::auth::Role;
use crate::models::UserSummary;

/// User profile as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub user_id: String,
    pub role: Role,
    /// Argon2 PHC string of the account PIN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn new(user_id: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            role,
            pin_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.user_id.clone(),
            role: self.role,
            has_pin: self.pin_hash.is_some(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for user profiles.
pub struct UserRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> UserRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    fn path(&self, user_id: &str) -> StorageResult<PathBuf> {
        validate_id(user_id)?;
        Ok(self.storage.paths().user(user_id))
    }

    pub fn exists(&self, user_id: &str) -> bool {
        self.path(user_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        let path = self.path(user_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("User {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Profile if one exists. An id that cannot name a file has no profile.
    pub fn find(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        match self.get(user_id) {
            Ok(user) => Ok(Some(user)),
            Err(StorageError::NotFound(_) | StorageError::InvalidId(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_all(&self) -> StorageResult<Vec<StoredUser>> {
        let mut users: Vec<StoredUser> = self.storage.load_all(self.storage.paths().users_dir())?;
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    /// Set a user's role, creating the profile if needed.
    pub fn set_role(&self, user_id: &str, role: Role) -> StorageResult<StoredUser> {
        self.upsert(user_id, role, |user| user.role = role)
    }

    /// Store a PIN hash, creating the profile with `role` if needed.
    pub fn set_pin_hash(&self, user_id: &str, role: Role, pin_hash: String) -> StorageResult<StoredUser> {
        self.upsert(user_id, role, move |user| user.pin_hash = Some(pin_hash))
    }

    fn upsert<F>(&self, user_id: &str, role: Role, apply: F) -> StorageResult<StoredUser>
    where
        F: FnOnce(&mut StoredUser),
    {
        let path = self.path(user_id)?;

        if !self.storage.exists(&path) {
            let mut user = StoredUser::new(user_id, role);
            apply(&mut user);
            self.storage.write_json(&path, &user)?;
            return Ok(user);
        }

        self.storage.update_json(&path, |user: &mut StoredUser| {
            apply(user);
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, JsonStorage) {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        (temp, storage)
    }

    #[test]
    fn set_role_creates_profile_lazily() {
        let (_temp, storage) = test_storage();
        let repo = UserRepository::new(&storage);

        assert!(repo.find("user_1").unwrap().is_none());
        let user = repo.set_role("user_1", Role::Manager).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(repo.get("user_1").unwrap().role, Role::Manager);
    }

    #[test]
    fn set_pin_keeps_existing_role() {
        let (_temp, storage) = test_storage();
        let repo = UserRepository::new(&storage);

        repo.set_role("user_1", Role::Admin).unwrap();
        let user = repo
            .set_pin_hash("user_1", Role::User, "$argon2id$fake".to_string())
            .unwrap();

        assert_eq!(user.role, Role::Admin);
        assert!(user.to_summary().has_pin);
    }

    #[test]
    fn persisted_shape_is_camel_case() {
        let mut user = StoredUser::new("user_1", Role::User);
        user.pin_hash = Some("hash".to_string());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "user_1");
        assert_eq!(json["role"], "user");
        assert_eq!(json["pinHash"], "hash");
    }

    #[test]
    fn hostile_user_ids_are_rejected() {
        let (_temp, storage) = test_storage();
        let repo = UserRepository::new(&storage);

        for id in ["", "..", "a/b", "a\\b", "x y"] {
            assert!(
                matches!(repo.set_role(id, Role::User), Err(StorageError::InvalidId(_))),
                "{id:?} should be rejected"
            );
        }
        assert!(repo.set_role("auth0|abc-123", Role::User).is_ok());
        assert!(repo.find("../cards/x").unwrap().is_none());
        assert!(!repo.exists("/etc/passwd"));
    }
}
