// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Staff API endpoints.
//!
//! - User overview (admin or manager)
//! - Role management (admin only)
//! - Audit log queries (admin only)
//!
//! Issuing temporary access grants lives in `api::access`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::{AdminOnly, PrivilegedOnly, Role},
    error::ApiError,
    models::{UpdateRoleRequest, UserSummary},
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditRepository, UserRepository},
};

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;
/// Longest date range one audit query may scan.
const MAX_AUDIT_RANGE_DAYS: i64 = 31;

/// Query parameters for audit log queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Start date (YYYY-MM-DD). Defaults to today.
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD). Defaults to the start date.
    pub end_date: Option<String>,
    /// Filter by acting user.
    pub user_id: Option<String>,
    /// Filter by resource type (card, access_grant, ...).
    pub resource_type: Option<String>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    /// Matching events before limit/offset.
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: usize,
}

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Stored user profiles", body = UserListResponse),
        (status = 403, description = "Admin or manager required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    PrivilegedOnly(staff): PrivilegedOnly,
) -> Result<Json<UserListResponse>, ApiError> {
    let users: Vec<UserSummary> = UserRepository::new(state.storage())
        .list_all()?
        .iter()
        .map(|user| user.to_summary())
        .collect();

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AdminAccess)
            .with_user(&staff.user_id)
            .with_details(json!({ "action": "list_users" }))
    );

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

/// Change a user's role. An admin cannot change their own role.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{user_id}/role",
    params(("user_id" = String, Path, description = "User whose role changes")),
    request_body = UpdateRoleRequest,
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated profile", body = UserSummary),
        (status = 400, description = "Own role or invalid user id"),
        (status = 403, description = "Admin required")
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    if user_id == admin.user_id {
        return Err(ApiError::bad_request("Admins cannot change their own role"));
    }

    let repo = UserRepository::new(state.storage());
    let previous = repo.find(&user_id)?.map(|user| user.role);
    let updated = repo.set_role(&user_id, request.role)?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %user_id,
        role = %request.role,
        "User role changed"
    );
    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::RoleChanged)
            .with_user(&admin.user_id)
            .with_resource("user", &user_id)
            .with_details(json!({
                "from": previous.unwrap_or(Role::User),
                "to": request.role,
            }))
    );

    Ok(Json(updated.to_summary()))
}

#[utoipa::path(
    get,
    path = "/v1/admin/audit/events",
    params(AuditQueryParams),
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Admin required")
    )
)]
pub async fn query_audit_events(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let start = match params.start_date.as_deref() {
        Some(date) => parse_date(date)?,
        None => Utc::now().date_naive(),
    };
    let end = match params.end_date.as_deref() {
        Some(date) => parse_date(date)?,
        None => start,
    };
    if end < start || (end - start).num_days() >= MAX_AUDIT_RANGE_DAYS {
        return Err(ApiError::bad_request(format!(
            "Date range must be ascending and at most {MAX_AUDIT_RANGE_DAYS} days"
        )));
    }

    let events = AuditRepository::new(state.storage()).read_events_range(
        &start.format("%Y-%m-%d").to_string(),
        &end.format("%Y-%m-%d").to_string(),
    )?;

    let matching: Vec<AuditEvent> = events
        .into_iter()
        .filter(|e| {
            params
                .user_id
                .as_deref()
                .is_none_or(|id| e.user_id.as_deref() == Some(id))
        })
        .filter(|e| {
            params
                .resource_type
                .as_deref()
                .is_none_or(|kind| e.resource_type.as_deref() == Some(kind))
        })
        .collect();

    let total = matching.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .min(MAX_AUDIT_LIMIT);
    let events: Vec<AuditEvent> = matching.into_iter().skip(offset).take(limit).collect();

    Ok(Json(AuditLogResponse {
        has_more: offset + events.len() < total,
        total,
        events,
    }))
}

fn parse_date(date: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid date '{date}', expected YYYY-MM-DD")))
}
