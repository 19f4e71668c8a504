// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Temporary access grant endpoints.
//!
//! - `POST /v1/admin/access-grants` (admin or manager): issue a grant
//! - `POST /v1/access/verify` (public): check a token
//! - `POST /v1/access/consume` (public): end a grant
//!
//! Tokens are never logged or written to the audit trail; grants are
//! referenced by id.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::{
    audit_log,
    auth::{PrivilegedOnly, TemporaryAccessService},
    error::ApiError,
    models::{
        AccessGrantResponse, AccessTokenRequest, ConsumeAccessResponse, CreateAccessGrantRequest,
        VerifyAccessResponse,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType, ConsumeOutcome},
};

#[utoipa::path(
    post,
    path = "/v1/admin/access-grants",
    request_body = CreateAccessGrantRequest,
    tag = "Access",
    responses(
        (status = 201, description = "Grant issued", body = AccessGrantResponse),
        (status = 400, description = "Missing user id"),
        (status = 403, description = "Admin or manager required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_access_grant(
    State(state): State<AppState>,
    PrivilegedOnly(staff): PrivilegedOnly,
    Json(request): Json<CreateAccessGrantRequest>,
) -> Result<(StatusCode, Json<AccessGrantResponse>), ApiError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }

    let issued = TemporaryAccessService::new(state.storage(), &state.public_app_url).grant(
        user_id,
        request.grant_type.unwrap_or_default(),
        request.permissions.unwrap_or_default(),
        &staff.user_id,
    )?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AccessGranted)
            .with_user(&staff.user_id)
            .with_resource("access_grant", &issued.grant_id)
            .with_details(json!({ "grantee": user_id, "expires_at": issued.expires_at }))
    );

    Ok((
        StatusCode::CREATED,
        Json(AccessGrantResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            link: issued.link,
        }),
    ))
}

/// Check a token without changing it.
#[utoipa::path(
    post,
    path = "/v1/access/verify",
    request_body = AccessTokenRequest,
    tag = "Access",
    responses((status = 200, body = VerifyAccessResponse))
)]
pub async fn verify_access(
    State(state): State<AppState>,
    Json(request): Json<AccessTokenRequest>,
) -> Result<Json<VerifyAccessResponse>, ApiError> {
    let outcome = TemporaryAccessService::new(state.storage(), &state.public_app_url)
        .verify(request.token.trim())?;

    Ok(Json(VerifyAccessResponse {
        valid: outcome.valid,
        grant_type: outcome.grant_type,
        user_id: outcome.user_id,
    }))
}

/// Mark a grant used. Consuming an already-used grant also succeeds.
#[utoipa::path(
    post,
    path = "/v1/access/consume",
    request_body = AccessTokenRequest,
    tag = "Access",
    responses(
        (status = 200, body = ConsumeAccessResponse),
        (status = 404, description = "Unknown token")
    )
)]
pub async fn consume_access(
    State(state): State<AppState>,
    Json(request): Json<AccessTokenRequest>,
) -> Result<Json<ConsumeAccessResponse>, ApiError> {
    let outcome = TemporaryAccessService::new(state.storage(), &state.public_app_url)
        .consume(request.token.trim())?;

    match outcome {
        ConsumeOutcome::Consumed => {
            audit_log!(state.storage(), AuditEvent::new(AuditEventType::AccessConsumed));
            Ok(Json(ConsumeAccessResponse { success: true }))
        }
        ConsumeOutcome::AlreadyConsumed => Ok(Json(ConsumeAccessResponse { success: true })),
        ConsumeOutcome::NotFound => Err(ApiError::not_found("Access token not found")),
    }
}
