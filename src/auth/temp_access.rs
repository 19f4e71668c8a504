// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Temporary Access Grants
//!
//! Staff (admin or manager) can issue a short-lived token that lets a normal
//! user edit their own protected records. The token is handed to the user as
//! a link; the user's client presents it in the `x-access-token` header.
//!
//! ## Lifecycle
//!
//! 1. `grant` - 32 random bytes, hex encoded, valid for 15 minutes
//! 2. `verify` - read-only check: exists, unused, not expired
//! 3. `consume` - marks the grant used; afterwards it is no longer valid
//! 4. `purge_expired` - removes grants 7 days after creation
//!
//! A grant is a time-boxed session: it may back any number of permitted
//! mutations until it expires or is consumed.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use url::Url;

use crate::storage::{
    AccessGrantRepository, ConsumeOutcome, GrantPermissions, GrantType, JsonStorage,
    StorageError, StorageResult, StoredAccessGrant,
};

/// Random bytes in a token (64 hex characters).
pub const TOKEN_BYTES: usize = 32;
/// Lifetime of a grant in seconds.
pub const GRANT_TTL_SECS: i64 = 15 * 60;
/// Age after which grants are deleted, whatever their state.
pub const GRANT_RETENTION_DAYS: i64 = 7;

/// A freshly issued grant.
#[derive(Debug, Clone)]
pub struct IssuedGrant {
    pub grant_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub link: String,
}

/// Result of verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub grant_type: Option<GrantType>,
    pub user_id: Option<String>,
}

impl VerifyOutcome {
    fn invalid() -> Self {
        Self {
            valid: false,
            grant_type: None,
            user_id: None,
        }
    }
}

/// Issues, verifies and consumes temporary access grants.
pub struct TemporaryAccessService<'a> {
    grants: AccessGrantRepository<'a>,
    public_app_url: &'a Url,
}

impl<'a> TemporaryAccessService<'a> {
    pub fn new(storage: &'a JsonStorage, public_app_url: &'a Url) -> Self {
        Self {
            grants: AccessGrantRepository::new(storage),
            public_app_url,
        }
    }

    /// Issue a grant for `user_id`.
    pub fn grant(
        &self,
        user_id: &str,
        grant_type: GrantType,
        permissions: GrantPermissions,
        issued_by: &str,
    ) -> StorageResult<IssuedGrant> {
        let now = Utc::now();
        let token = generate_token();
        let link = access_link(self.public_app_url, &token)?;

        let grant = StoredAccessGrant {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token: token.clone(),
            grant_type,
            expires_at: now + Duration::seconds(GRANT_TTL_SECS),
            used: false,
            permissions,
            started_at: now,
            duration: GRANT_TTL_SECS,
            created_at: now,
            issued_by: issued_by.to_string(),
        };
        self.grants.create(&grant)?;

        tracing::info!(
            grant_id = %grant.id,
            user_id = %grant.user_id,
            issued_by = %grant.issued_by,
            expires_at = %grant.expires_at,
            "Issued temporary access grant"
        );

        Ok(IssuedGrant {
            grant_id: grant.id,
            token,
            expires_at: grant.expires_at,
            link,
        })
    }

    pub fn verify(&self, token: &str) -> StorageResult<VerifyOutcome> {
        self.verify_at(token, Utc::now())
    }

    /// Check a token as of `now`. Never changes state.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> StorageResult<VerifyOutcome> {
        let Some(grant) = self.grants.find_by_token(token)? else {
            return Ok(VerifyOutcome::invalid());
        };
        if grant.used || grant.is_expired_at(now) {
            return Ok(VerifyOutcome::invalid());
        }

        Ok(VerifyOutcome {
            valid: true,
            grant_type: Some(grant.grant_type),
            user_id: Some(grant.user_id),
        })
    }

    /// Mark the grant used. Safe to call more than once.
    pub fn consume(&self, token: &str) -> StorageResult<ConsumeOutcome> {
        let outcome = self.grants.consume(token)?;
        tracing::debug!(?outcome, "Consume temporary access grant");
        Ok(outcome)
    }

    /// Delete grants created more than seven days before `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        self.grants
            .purge_created_before(now - Duration::days(GRANT_RETENTION_DAYS))
    }
}

/// 32 bytes from the OS RNG, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `{public_app_url}/access/edit?token={token}`
fn access_link(base: &Url, token: &str) -> StorageResult<String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StorageError::SerializationError(format!("Cannot build access link on {base}")))?
        .pop_if_empty()
        .extend(["access", "edit"]);
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url.to_string())
}
