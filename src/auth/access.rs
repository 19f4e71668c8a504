// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access gate for mutations of protected records.
//!
//! Admins and managers may always mutate. Everyone else must be the record
//! owner and present a live temporary access grant, bound to their account,
//! whose permissions cover the action.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};

use super::{AuthError, AuthenticatedUser};
use crate::storage::{AccessGrantRepository, GrantAction, JsonStorage};

/// Header carrying the temporary access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Why a mutation was allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Requester is admin or manager.
    Role,
    /// Requester presented a valid grant.
    Grant { grant_id: String },
}

/// The `x-access-token` header, if present.
#[derive(Debug, Clone, Default)]
pub struct PresentedAccessToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for PresentedAccessToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(PresentedAccessToken(token))
    }
}

/// Decide whether `requester` may perform `action` on records of `owner_user_id`.
pub fn authorize_mutation(
    storage: &JsonStorage,
    requester: &AuthenticatedUser,
    owner_user_id: &str,
    presented_token: Option<&str>,
    action: GrantAction,
) -> Result<AccessDecision, AuthError> {
    authorize_mutation_at(
        storage,
        requester,
        owner_user_id,
        presented_token,
        action,
        Utc::now(),
    )
}

/// Clock-injected form of [`authorize_mutation`].
pub fn authorize_mutation_at(
    storage: &JsonStorage,
    requester: &AuthenticatedUser,
    owner_user_id: &str,
    presented_token: Option<&str>,
    action: GrantAction,
    now: DateTime<Utc>,
) -> Result<AccessDecision, AuthError> {
    if requester.is_privileged() {
        return Ok(AccessDecision::Role);
    }

    let token = presented_token.ok_or(AuthError::AccessTokenRequired)?;

    if requester.user_id != owner_user_id {
        return Err(AuthError::NotOwner);
    }

    let grant = AccessGrantRepository::new(storage)
        .find_unused_for_user(token, owner_user_id)?
        .ok_or(AuthError::InvalidAccessToken)?;

    if grant.is_expired_at(now) {
        return Err(AuthError::AccessTokenExpired);
    }

    if !grant.permissions.allows(action) {
        return Err(AuthError::ActionNotPermitted(action));
    }

    tracing::debug!(
        grant_id = %grant.id,
        user_id = %requester.user_id,
        %action,
        "Mutation allowed by temporary access grant"
    );
    Ok(AccessDecision::Grant { grant_id: grant.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::{GrantPermissions, GrantType, StoredAccessGrant};
    use axum::http::Request;
    use chrono::Duration;
    use tempfile::TempDir;

    fn user(user_id: &str, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            session_id: None,
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    fn setup_with_grant(permissions: GrantPermissions) -> (TempDir, JsonStorage, StoredAccessGrant) {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        let now = Utc::now();
        let grant = StoredAccessGrant {
            id: "grant-1".to_string(),
            user_id: "user_1".to_string(),
            token: "a".repeat(64),
            grant_type: GrantType::EditProfile,
            expires_at: now + Duration::minutes(15),
            used: false,
            permissions,
            started_at: now,
            duration: 900,
            created_at: now,
            issued_by: "admin_1".to_string(),
        };
        AccessGrantRepository::new(&storage).create(&grant).unwrap();
        (temp, storage, grant)
    }

    #[test]
    fn privileged_roles_bypass_tokens() {
        let (_temp, storage, _) = setup_with_grant(GrantPermissions::default());
        for role in [Role::Admin, Role::Manager] {
            let decision =
                authorize_mutation(&storage, &user("staff", role), "user_1", None, GrantAction::Delete)
                    .unwrap();
            assert_eq!(decision, AccessDecision::Role);
        }
    }

    #[test]
    fn user_without_token_is_rejected() {
        let (_temp, storage, _) = setup_with_grant(GrantPermissions::default());
        let result = authorize_mutation(
            &storage,
            &user("user_1", Role::User),
            "user_1",
            None,
            GrantAction::Add,
        );
        assert!(matches!(result, Err(AuthError::AccessTokenRequired)));
    }

    #[test]
    fn valid_grant_allows_owner_repeatedly() {
        let (_temp, storage, grant) = setup_with_grant(GrantPermissions::default());
        let owner = user("user_1", Role::User);

        for action in [GrantAction::Add, GrantAction::Edit, GrantAction::Delete] {
            let decision =
                authorize_mutation(&storage, &owner, "user_1", Some(&grant.token), action).unwrap();
            assert_eq!(
                decision,
                AccessDecision::Grant {
                    grant_id: "grant-1".to_string()
                }
            );
        }
    }

    #[test]
    fn grant_cannot_be_used_on_someone_else() {
        let (_temp, storage, grant) = setup_with_grant(GrantPermissions::default());

        let other = user("user_2", Role::User);
        let result =
            authorize_mutation(&storage, &other, "user_1", Some(&grant.token), GrantAction::Edit);
        assert!(matches!(result, Err(AuthError::NotOwner)));

        let result =
            authorize_mutation(&storage, &other, "user_2", Some(&grant.token), GrantAction::Edit);
        assert!(matches!(result, Err(AuthError::InvalidAccessToken)));
    }

    #[test]
    fn expired_grant_is_rejected() {
        let (_temp, storage, grant) = setup_with_grant(GrantPermissions::default());
        let result = authorize_mutation_at(
            &storage,
            &user("user_1", Role::User),
            "user_1",
            Some(&grant.token),
            GrantAction::Edit,
            grant.expires_at + Duration::seconds(1),
        );
        assert!(matches!(result, Err(AuthError::AccessTokenExpired)));
    }

    #[test]
    fn consumed_grant_is_rejected() {
        let (_temp, storage, grant) = setup_with_grant(GrantPermissions::default());
        AccessGrantRepository::new(&storage).consume(&grant.token).unwrap();

        let result = authorize_mutation(
            &storage,
            &user("user_1", Role::User),
            "user_1",
            Some(&grant.token),
            GrantAction::Edit,
        );
        assert!(matches!(result, Err(AuthError::InvalidAccessToken)));
    }

    #[test]
    fn permissions_are_enforced_per_action() {
        let (_temp, storage, grant) = setup_with_grant(GrantPermissions {
            can_add: true,
            can_edit: true,
            can_delete: false,
        });
        let result = authorize_mutation(
            &storage,
            &user("user_1", Role::User),
            "user_1",
            Some(&grant.token),
            GrantAction::Delete,
        );
        assert!(matches!(
            result,
            Err(AuthError::ActionNotPermitted(GrantAction::Delete))
        ));
    }

    #[tokio::test]
    async fn presented_token_reads_header() {
        let mut parts = Request::builder()
            .uri("/test")
            .header(ACCESS_TOKEN_HEADER, " abc123 ")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let PresentedAccessToken(token) =
            PresentedAccessToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.as_deref(), Some("abc123"));

        let mut parts = Request::builder().uri("/test").body(()).unwrap().into_parts().0;
        let PresentedAccessToken(token) =
            PresentedAccessToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(token.is_none());
    }
}
