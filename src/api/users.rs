// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    audit_log,
    auth::{pin::hash_pin, Auth},
    error::ApiError,
    models::{SetPinRequest, UserProfileResponse},
    state::AppState,
    storage::{AuditEventType, UserRepository},
};

/// Get the current user's profile.
///
/// The role is the effective one: a stored role overrides the token claim.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user info", body = UserProfileResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let has_pin = UserRepository::new(state.storage())
        .find(&user.user_id)?
        .is_some_and(|profile| profile.pin_hash.is_some());

    Ok(Json(UserProfileResponse {
        user_id: user.user_id,
        role: user.role,
        has_pin,
        session_id: user.session_id,
    }))
}

/// Set or replace the account PIN (4 to 6 digits).
#[utoipa::path(
    put,
    path = "/v1/users/me/pin",
    request_body = SetPinRequest,
    tag = "Users",
    responses(
        (status = 204, description = "PIN stored"),
        (status = 422, description = "PIN is not 4 to 6 digits")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_pin(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<SetPinRequest>,
) -> Result<StatusCode, ApiError> {
    let pin_hash = hash_pin(&request.pin)?;
    UserRepository::new(state.storage()).set_pin_hash(&user.user_id, user.role, pin_hash)?;

    audit_log!(state.storage(), AuditEventType::PinChanged, user, "user", &user.user_id);
    tracing::info!(user_id = %user.user_id, "Account PIN updated");

    Ok(StatusCode::NO_CONTENT)
}
