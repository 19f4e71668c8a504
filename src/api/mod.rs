// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit_log,
    auth::{authorize_mutation, AccessDecision, AuthenticatedUser, PresentedAccessToken, Role},
    error::ApiError,
    models::{
        AccessGrantResponse, AccessTokenRequest, AddressView, BankAccountView, CardView,
        CloseTicketRequest, ConsumeAccessResponse, CreateAccessGrantRequest, CreateAddressRequest,
        CreateBankAccountRequest, CreateCardRequest, CreateTicketRequest, RevealCardRequest,
        RevealedCard, SetPinRequest, Ticket, UpdateAddressRequest, UpdateBankAccountRequest,
        UpdateCardRequest, UpdateRoleRequest, UserProfileResponse, UserSummary,
        VerifyAccessResponse,
    },
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, GrantAction, GrantPermissions, GrantType, TicketStatus,
    },
};

pub mod access;
pub mod addresses;
pub mod admin;
pub mod bank_accounts;
pub mod cards;
pub mod health;
pub mod tickets;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        // Users
        .route("/users/me", get(users::get_current_user))
        .route("/users/me/pin", put(users::set_pin))
        // Cards
        .route(
            "/users/{user_id}/cards",
            get(cards::list_cards).post(cards::create_card),
        )
        .route(
            "/users/{user_id}/cards/{card_id}",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route(
            "/users/{user_id}/cards/{card_id}/reveal",
            post(cards::reveal_card),
        )
        // Bank accounts
        .route(
            "/users/{user_id}/bank-accounts",
            get(bank_accounts::list_bank_accounts).post(bank_accounts::create_bank_account),
        )
        .route(
            "/users/{user_id}/bank-accounts/{account_id}",
            put(bank_accounts::update_bank_account).delete(bank_accounts::delete_bank_account),
        )
        // Addresses
        .route(
            "/users/{user_id}/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/users/{user_id}/addresses/{address_id}",
            put(addresses::update_address).delete(addresses::delete_address),
        )
        // Temporary access
        .route("/access/verify", post(access::verify_access))
        .route("/access/consume", post(access::consume_access))
        // Tickets
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/tickets/{ticket_id}", get(tickets::get_ticket))
        .route("/tickets/{ticket_id}/close", post(tickets::close_ticket))
        // Staff
        .route("/admin/access-grants", post(access::create_access_grant))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{user_id}/role", put(admin::update_user_role))
        .route("/admin/audit/events", get(admin::query_audit_events));

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Run the access gate for a mutation of `owner_user_id`'s records.
///
/// Denials are written to the audit log before being returned.
pub(crate) fn authorize(
    state: &AppState,
    user: &AuthenticatedUser,
    owner_user_id: &str,
    token: &PresentedAccessToken,
    action: GrantAction,
    resource_type: &str,
) -> Result<AccessDecision, ApiError> {
    authorize_mutation(
        state.storage(),
        user,
        owner_user_id,
        token.0.as_deref(),
        action,
    )
    .map_err(|rejected| {
        if rejected.is_gate_denial() {
            tracing::warn!(
                user_id = %user.user_id,
                owner_user_id = %owner_user_id,
                %action,
                reason = rejected.error_code(),
                "Mutation denied"
            );
            audit_log!(
                state.storage(),
                AuditEvent::new(AuditEventType::AccessDenied)
                    .with_user(&user.user_id)
                    .with_resource(resource_type, owner_user_id)
                    .with_details(json!({ "action": action.to_string() }))
                    .failed(rejected.error_code())
            );
        }
        ApiError::from(rejected)
    })
}

/// Audit details describing how a mutation was authorized.
pub(crate) fn decision_details(decision: &AccessDecision) -> serde_json::Value {
    match decision {
        AccessDecision::Role => json!({ "authorized_by": "role" }),
        AccessDecision::Grant { grant_id } => {
            json!({ "authorized_by": "access_grant", "grant_id": grant_id })
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::get_current_user,
        users::set_pin,
        cards::list_cards,
        cards::get_card,
        cards::create_card,
        cards::update_card,
        cards::delete_card,
        cards::reveal_card,
        bank_accounts::list_bank_accounts,
        bank_accounts::create_bank_account,
        bank_accounts::update_bank_account,
        bank_accounts::delete_bank_account,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        access::create_access_grant,
        access::verify_access,
        access::consume_access,
        tickets::create_ticket,
        tickets::list_tickets,
        tickets::get_ticket,
        tickets::close_ticket,
        admin::list_users,
        admin::update_user_role,
        admin::query_audit_events
    ),
    components(
        schemas(
            CardView,
            CreateCardRequest,
            UpdateCardRequest,
            RevealCardRequest,
            RevealedCard,
            BankAccountView,
            CreateBankAccountRequest,
            UpdateBankAccountRequest,
            AddressView,
            CreateAddressRequest,
            UpdateAddressRequest,
            UserProfileResponse,
            UserSummary,
            SetPinRequest,
            UpdateRoleRequest,
            Role,
            Ticket,
            TicketStatus,
            CreateTicketRequest,
            CloseTicketRequest,
            CreateAccessGrantRequest,
            AccessGrantResponse,
            AccessTokenRequest,
            VerifyAccessResponse,
            ConsumeAccessResponse,
            GrantType,
            GrantPermissions,
            AuditEvent,
            AuditEventType,
            admin::AuditLogResponse,
            admin::UserListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Users", description = "Current user profile and account PIN"),
        (name = "Cards", description = "Encrypted payment cards"),
        (name = "Bank Accounts", description = "Encrypted bank accounts"),
        (name = "Addresses", description = "Encrypted postal addresses"),
        (name = "Access", description = "Temporary access grants"),
        (name = "Tickets", description = "Support tickets"),
        (name = "Admin", description = "Staff tooling")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::TemporaryAccessService;

    pub fn user_with_role(user_id: &str, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            session_id: None,
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    /// Issue a grant for `user_id` and return its token.
    pub fn issue_grant(state: &AppState, user_id: &str, permissions: GrantPermissions) -> String {
        TemporaryAccessService::new(state.storage(), &state.public_app_url)
            .grant(user_id, GrantType::EditProfile, permissions, "admin_1")
            .unwrap()
            .token
    }
}
