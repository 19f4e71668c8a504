// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rejections raised while identifying a caller or gating a vault mutation.
//!
//! One enum covers both stages: the bearer extractors fail with 401 (or 403
//! on a missing role) and the access gate fails with 403. Every variant has
//! a stable `error_code` that clients match on. Responses go through
//! `ApiError`, so the body is always `{"error", "error_code"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::Role;
use crate::error::ApiError;
use crate::storage::{GrantAction, StorageError};

/// Why a bearer JWT was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token is malformed")]
    Malformed,
    #[error("signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("unexpected issuer")]
    WrongIssuer,
    #[error("unexpected audience")]
    WrongAudience,
    #[error("no signing key matches the token")]
    UnknownKey,
}

impl TokenRejection {
    fn code(self) -> &'static str {
        match self {
            TokenRejection::Malformed => "malformed_token",
            TokenRejection::BadSignature => "invalid_signature",
            TokenRejection::Expired => "token_expired",
            TokenRejection::NotYetValid => "token_not_yet_valid",
            TokenRejection::WrongIssuer => "invalid_issuer",
            TokenRejection::WrongAudience => "invalid_audience",
            TokenRejection::UnknownKey => "no_matching_key",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingBearer,

    #[error("Expected 'Authorization: Bearer <token>'")]
    MalformedHeader,

    #[error("Session rejected: {0}")]
    Token(TokenRejection),

    /// The caller's role is below the one the route needs.
    #[error("Requires the {0} role or higher")]
    RoleRequired(Role),

    #[error("A temporary access token is required for this operation")]
    AccessTokenRequired,

    #[error("You can only modify your own records")]
    NotOwner,

    #[error("Invalid or used access token")]
    InvalidAccessToken,

    #[error("Access token has expired")]
    AccessTokenExpired,

    #[error("Access token does not allow {0}")]
    ActionNotPermitted(GrantAction),

    /// Signing keys could not be fetched or parsed.
    #[error("Signing keys unavailable: {0}")]
    KeySet(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<TokenRejection> for AuthError {
    fn from(rejection: TokenRejection) -> Self {
        AuthError::Token(rejection)
    }
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingBearer => "missing_auth_header",
            AuthError::MalformedHeader => "invalid_auth_header",
            AuthError::Token(rejection) => rejection.code(),
            AuthError::RoleRequired(_) => "insufficient_role",
            AuthError::AccessTokenRequired => "access_token_required",
            AuthError::NotOwner => "not_owner",
            AuthError::InvalidAccessToken => "invalid_access_token",
            AuthError::AccessTokenExpired => "access_token_expired",
            AuthError::ActionNotPermitted(_) => "action_not_permitted",
            AuthError::KeySet(_) => "auth_unavailable",
            AuthError::Storage(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingBearer | AuthError::MalformedHeader | AuthError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::KeySet(_) | AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }

    /// True for access-gate rejections of a vault mutation.
    pub fn is_gate_denial(&self) -> bool {
        matches!(
            self,
            AuthError::AccessTokenRequired
                | AuthError::NotOwner
                | AuthError::InvalidAccessToken
                | AuthError::AccessTokenExpired
                | AuthError::ActionNotPermitted(_)
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_bearer_renders_401_with_code() {
        let response = AuthError::MissingBearer.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[test]
    fn token_rejections_are_401() {
        let err = AuthError::from(TokenRejection::Expired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "token_expired");
        assert_eq!(err.to_string(), "Session rejected: token has expired");
    }

    #[test]
    fn gate_denials_are_403() {
        for err in [
            AuthError::AccessTokenRequired,
            AuthError::NotOwner,
            AuthError::InvalidAccessToken,
            AuthError::AccessTokenExpired,
            AuthError::ActionNotPermitted(GrantAction::Delete),
        ] {
            assert!(err.is_gate_denial());
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        }
        assert!(!AuthError::RoleRequired(Role::Admin).is_gate_denial());
        assert_eq!(
            AuthError::ActionNotPermitted(GrantAction::Delete).to_string(),
            "Access token does not allow delete"
        );
    }

    #[tokio::test]
    async fn internal_failures_hide_details() {
        let err = AuthError::KeySet("connect timeout to idp.internal".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("idp.internal"));

        let err = AuthError::Storage(StorageError::LockPoisoned);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
