// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Validation};

use super::claims::JwtClaims;
use super::{AuthError, AuthenticatedUser, Role, TokenRejection};
use crate::state::{AppState, AuthConfig};
use crate::storage::{JsonStorage, UserRepository};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// Validates the bearer JWT and resolves the effective role: a role stored
/// in the user's profile wins over the token's `publicMetadata.role`.
///
/// ## Authentication Modes
///
/// - **Production mode** (`AUTH_JWKS_URL` set): full JWT verification against the JWKS
/// - **Development mode** (no `AUTH_JWKS_URL`): structure and expiry only, no signature check
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A user placed in extensions by an outer layer is already resolved.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingBearer)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedHeader)?;

        let mut user = verify_jwt(token, &state.auth_config).await?;
        apply_stored_role(state.storage(), &mut user)?;

        Ok(Auth(user))
    }
}

/// Replace the token role with the stored profile role, if any.
fn apply_stored_role(storage: &JsonStorage, user: &mut AuthenticatedUser) -> Result<(), AuthError> {
    let stored = UserRepository::new(storage)
        .find(&user.user_id)
        .map_err(|e| {
            tracing::error!(user_id = %user.user_id, error = %e, "Failed to load user profile");
            AuthError::Storage(e)
        })?;

    if let Some(profile) = stored {
        user.role = profile.role;
    }
    Ok(())
}

/// Verify JWT and extract user information.
async fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match &auth_config.jwks {
        Some(jwks) => verify_jwt_production(token, jwks, auth_config).await,
        None => verify_jwt_development(token),
    }
}

async fn verify_jwt_production(
    token: &str,
    jwks: &super::JwksManager,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(|_| TokenRejection::Malformed)?;

    let (decoding_key, algorithm) = match &header.kid {
        Some(kid) => jwks.get_decoding_key(kid).await?,
        None => jwks.get_any_decoding_key().await?,
    };

    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(issuer) = &auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    match &auth_config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            ErrorKind::InvalidSignature => TokenRejection::BadSignature,
            ErrorKind::InvalidIssuer => TokenRejection::WrongIssuer,
            ErrorKind::InvalidAudience => TokenRejection::WrongAudience,
            ErrorKind::ImmatureSignature => TokenRejection::NotYetValid,
            _ => TokenRejection::Malformed,
        }
    })?;

    Ok(AuthenticatedUser::from_claims(token_data.claims))
}

/// Development JWT verification (no signature check).
///
/// WARNING: only for local development and tests.
fn verify_jwt_development(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<JwtClaims>(token)
        .map_err(|_| TokenRejection::Malformed)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(TokenRejection::Expired.into());
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::RoleRequired(Role::Admin));
        }

        Ok(AdminOnly(user))
    }
}

/// Extractor that requires admin or manager.
pub struct PrivilegedOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for PrivilegedOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_privileged() {
            return Err(AuthError::RoleRequired(Role::Manager));
        }

        Ok(PrivilegedOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::http::Request;

    /// Unsigned test JWT (development mode ignores the signature).
    fn create_test_jwt(user_id: &str, role: Option<&str>, exp: i64) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let mut claims = serde_json::json!({
            "sub": user_id,
            "iat": 1609459200,
            "exp": exp,
            "iss": "test",
            "sid": "sess_123",
        });
        if let Some(role) = role {
            claims["publicMetadata"] = serde_json::json!({ "role": role });
        }

        format!(
            "{}.{}.fake_signature",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp_dir) = test_state();
        let mut parts = parts_with_token(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingBearer)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer() {
        let (state, _temp_dir) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MalformedHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let (state, _temp_dir) = test_state();
        let token = create_test_jwt("user_123", Some("manager"), 9999999999);
        let mut parts = parts_with_token(Some(&token));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.session_id.as_deref(), Some("sess_123"));
    }

    #[tokio::test]
    async fn expired_jwt_is_rejected() {
        let (state, _temp_dir) = test_state();
        let token = create_test_jwt("user_123", None, 1609459200);
        let mut parts = parts_with_token(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Token(TokenRejection::Expired))));
    }

    #[tokio::test]
    async fn stored_role_overrides_token_role() {
        let (state, _temp_dir) = test_state();
        UserRepository::new(state.storage())
            .set_role("user_123", Role::User)
            .unwrap();

        let token = create_test_jwt("user_123", Some("admin"), 9999999999);
        let mut parts = parts_with_token(Some(&token));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _temp_dir) = test_state();
        let mut parts = parts_with_token(None);
        parts.extensions.insert(AuthenticatedUser {
            user_id: "user_from_layer".to_string(),
            role: Role::Admin,
            session_id: None,
            issuer: "layer".to_string(),
            expires_at: 0,
        });

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_from_layer");
    }

    #[tokio::test]
    async fn admin_only_rejects_manager() {
        let (state, _temp_dir) = test_state();
        let token = create_test_jwt("manager_1", Some("manager"), 9999999999);
        let mut parts = parts_with_token(Some(&token));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::RoleRequired(_))));
    }

    #[tokio::test]
    async fn privileged_only_accepts_manager_rejects_user() {
        let (state, _temp_dir) = test_state();

        let token = create_test_jwt("manager_1", Some("manager"), 9999999999);
        let mut parts = parts_with_token(Some(&token));
        assert!(PrivilegedOnly::from_request_parts(&mut parts, &state).await.is_ok());

        let token = create_test_jwt("user_1", None, 9999999999);
        let mut parts = parts_with_token(Some(&token));
        let result = PrivilegedOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::RoleRequired(_))));
    }
}
