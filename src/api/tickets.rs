// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Support ticket endpoints.
//!
//! Any authenticated user can open a ticket and read their own. Admins and
//! managers see every ticket and close them. Listing also drops tickets
//! that were closed more than a day ago.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    audit_log,
    auth::{Auth, PrivilegedOnly},
    error::ApiError,
    maintenance::CLOSED_TICKET_RETENTION_HOURS,
    models::{CloseTicketRequest, CreateTicketRequest, Ticket},
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, OwnershipEnforcer, StoredTicket, TicketRepository,
    },
};

const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

#[utoipa::path(
    post,
    path = "/v1/tickets",
    request_body = CreateTicketRequest,
    tag = "Tickets",
    responses((status = 201, body = Ticket), (status = 400)),
    security(("bearer_auth" = []))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let subject = request.subject.trim();
    let message = request.message.trim();

    if subject.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request("Subject and message are required"));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN || message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "Subject is limited to {MAX_SUBJECT_LEN} characters, message to {MAX_MESSAGE_LEN}"
        )));
    }

    let ticket = StoredTicket::new(&user.user_id, subject, message);
    TicketRepository::new(state.storage()).create(&ticket)?;

    audit_log!(state.storage(), AuditEventType::TicketCreated, user, "ticket", &ticket.id);

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

/// Own tickets for users, all tickets for admins and managers. Newest first.
#[utoipa::path(
    get,
    path = "/v1/tickets",
    tag = "Tickets",
    responses((status = 200, body = [Ticket])),
    security(("bearer_auth" = []))
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let repo = TicketRepository::new(state.storage());

    let cutoff = Utc::now() - Duration::hours(CLOSED_TICKET_RETENTION_HOURS);
    if let Err(e) = repo.purge_closed_before(cutoff) {
        tracing::warn!(error = %e, "Failed to purge closed tickets");
    }

    let tickets = if user.is_privileged() {
        repo.list_all()?
    } else {
        repo.list_by_user(&user.user_id)?
    };

    Ok(Json(tickets.into_iter().map(Ticket::from).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/tickets/{ticket_id}",
    params(("ticket_id" = String, Path, description = "Ticket identifier")),
    tag = "Tickets",
    responses((status = 200, body = Ticket), (status = 403), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(ticket_id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = TicketRepository::new(state.storage()).get(&ticket_id)?;
    ticket.verify_read_access(&user)?;
    Ok(Json(ticket.into()))
}

#[utoipa::path(
    post,
    path = "/v1/tickets/{ticket_id}/close",
    params(("ticket_id" = String, Path, description = "Ticket identifier")),
    request_body = CloseTicketRequest,
    tag = "Tickets",
    responses(
        (status = 200, body = Ticket),
        (status = 403, description = "Admin or manager required"),
        (status = 404),
        (status = 409, description = "Ticket already closed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn close_ticket(
    State(state): State<AppState>,
    PrivilegedOnly(staff): PrivilegedOnly,
    Path(ticket_id): Path<String>,
    Json(request): Json<CloseTicketRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = TicketRepository::new(state.storage()).close(
        &ticket_id,
        &staff.user_id,
        request.resolution.as_deref(),
    )?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::TicketClosed)
            .with_user(&staff.user_id)
            .with_resource("ticket", &ticket.id)
            .with_details(json!({ "ticket_owner": ticket.user_id }))
    );

    Ok(Json(ticket.into()))
}
