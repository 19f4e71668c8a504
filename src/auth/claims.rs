// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims read from an identity-provider JWT.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Session ID
    #[serde(default)]
    pub sid: Option<String>,
    /// Public metadata containing the role
    #[serde(default, rename = "publicMetadata")]
    pub public_metadata: Option<PublicMetadata>,
}

/// Public user metadata carried in the token.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PublicMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user information extracted from JWT.
///
/// `role` is the effective role: a role stored in the user's profile (set by
/// an admin) takes precedence over the token claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// User's role
    pub role: Role,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token issuer (not serialized)
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build from decoded claims. Role defaults to `User`.
    pub fn from_claims(claims: JwtClaims) -> Self {
        let role = claims
            .public_metadata
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .and_then(Role::parse)
            .unwrap_or_default();

        Self {
            user_id: claims.sub,
            role,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin or manager.
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(role: Option<&str>) -> JwtClaims {
        JwtClaims {
            sub: "user_123".to_string(),
            exp: 1700003600,
            iss: "https://auth.example.com".to_string(),
            sid: Some("sess_abc".to_string()),
            public_metadata: Some(PublicMetadata {
                role: role.map(str::to_string),
            }),
        }
    }

    #[test]
    fn from_claims_extracts_identity() {
        let user = AuthenticatedUser::from_claims(sample_claims(None));
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
        assert_eq!(user.expires_at, 1700003600);
    }

    #[test]
    fn from_claims_extracts_role() {
        let user = AuthenticatedUser::from_claims(sample_claims(Some("manager")));
        assert_eq!(user.role, Role::Manager);
        assert!(user.is_privileged());
        assert!(!user.is_admin());
    }

    #[test]
    fn unknown_or_missing_role_defaults_to_user() {
        let user = AuthenticatedUser::from_claims(sample_claims(Some("superuser")));
        assert_eq!(user.role, Role::User);

        let mut claims = sample_claims(None);
        claims.public_metadata = None;
        assert_eq!(AuthenticatedUser::from_claims(claims).role, Role::User);
    }

    #[test]
    fn serialization_skips_token_internals() {
        let user = AuthenticatedUser::from_claims(sample_claims(Some("admin")));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("issuer").is_none());
        assert!(json.get("expires_at").is_none());
        assert_eq!(json["role"], "admin");
    }
}
