// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for stored records.
//!
//! Reads are allowed to the owner and to privileged staff. Mutations go
//! through the temporary-access gate in `auth::access` instead.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Resource kind used in error messages.
    fn resource_kind(&self) -> &'static str {
        "resource"
    }
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;

    /// Verify that the user owns this resource or is admin/manager.
    fn verify_read_access(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: self.resource_kind().to_string(),
            })
        }
    }

    fn verify_read_access(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if user.is_privileged() {
            return Ok(());
        }
        self.verify_ownership(user)
    }
}

/// Check that `user` may read records belonging to `owner_user_id`.
pub fn ensure_can_read(user: &AuthenticatedUser, owner_user_id: &str) -> StorageResult<()> {
    if user.is_privileged() || user.user_id == owner_user_id {
        Ok(())
    } else {
        Err(StorageError::PermissionDenied {
            user_id: user.user_id.clone(),
            resource: format!("records of {owner_user_id}"),
        })
    }
}
