// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card endpoints.
//!
//! Listing and single reads return masked views. Mutations pass the access
//! gate. The real number, CVV and card PIN are only returned by `reveal`,
//! after the owner re-enters their account PIN.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use super::{authorize, decision_details};
use crate::{
    audit_log,
    auth::{pin::verify_pin, Auth, PresentedAccessToken},
    error::ApiError,
    models::{CardView, CreateCardRequest, RevealCardRequest, RevealedCard, UpdateCardRequest},
    state::AppState,
    storage::{
        ensure_can_read, AuditEvent, AuditEventType, CardRepository, GrantAction, StoredCard,
        UserRepository,
    },
};

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/cards",
    params(("user_id" = String, Path, description = "Owner of the cards")),
    tag = "Cards",
    responses(
        (status = 200, body = [CardView]),
        (status = 403, description = "Not the owner or a privileged role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_cards(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CardView>>, ApiError> {
    ensure_can_read(&user, &user_id)?;
    let cards = CardRepository::new(state.storage()).list_by_owner(&user_id)?;
    Ok(Json(
        cards.iter().map(|card| card.to_view(state.cipher())).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/cards/{card_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the card"),
        ("card_id" = String, Path, description = "Card identifier")
    ),
    tag = "Cards",
    responses((status = 200, body = CardView), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn get_card(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path((user_id, card_id)): Path<(String, String)>,
) -> Result<Json<CardView>, ApiError> {
    ensure_can_read(&user, &user_id)?;
    let card = CardRepository::new(state.storage()).get_owned(&card_id, &user_id)?;
    Ok(Json(card.to_view(state.cipher())))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/cards",
    params(("user_id" = String, Path, description = "Owner of the new card")),
    request_body = CreateCardRequest,
    tag = "Cards",
    responses(
        (status = 201, body = CardView),
        (status = 400, description = "Card number missing"),
        (status = 403, description = "Access gate denied the request")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_card(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path(user_id): Path<String>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Add, "card")?;

    if request.number.trim().is_empty() {
        return Err(ApiError::bad_request("Card number is required"));
    }

    let card = StoredCard::new(state.cipher(), &user_id, &request);
    CardRepository::new(state.storage()).create(&card)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::CardCreated)
            .with_user(&user.user_id)
            .with_resource("card", &card.id)
            .with_details(decision_details(&decision))
    );

    Ok((StatusCode::CREATED, Json(card.to_view(state.cipher()))))
}

#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/cards/{card_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the card"),
        ("card_id" = String, Path, description = "Card identifier")
    ),
    request_body = UpdateCardRequest,
    tag = "Cards",
    responses(
        (status = 200, body = CardView),
        (status = 403, description = "Access gate denied the request"),
        (status = 404)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_card(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, card_id)): Path<(String, String)>,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<CardView>, ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Edit, "card")?;

    if request.number.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Card number cannot be cleared"));
    }

    let repo = CardRepository::new(state.storage());
    let card = repo.update_owned(&card_id, &user_id, |card| {
        card.apply_update(state.cipher(), &request);
    })?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::CardUpdated)
            .with_user(&user.user_id)
            .with_resource("card", &card.id)
            .with_details(decision_details(&decision))
    );

    Ok(Json(card.to_view(state.cipher())))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}/cards/{card_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the card"),
        ("card_id" = String, Path, description = "Card identifier")
    ),
    tag = "Cards",
    responses(
        (status = 204),
        (status = 403, description = "Access gate denied the request"),
        (status = 404)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_card(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, card_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Delete, "card")?;

    let repo = CardRepository::new(state.storage());
    let card = repo.get_owned(&card_id, &user_id)?;
    repo.delete(&card.id)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::CardDeleted)
            .with_user(&user.user_id)
            .with_resource("card", &card.id)
            .with_details(decision_details(&decision))
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Reveal the decrypted number, CVV and card PIN.
///
/// Owner only. The account PIN is verified first; a wrong PIN is audited.
#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/cards/{card_id}/reveal",
    params(
        ("user_id" = String, Path, description = "Owner of the card"),
        ("card_id" = String, Path, description = "Card identifier")
    ),
    request_body = RevealCardRequest,
    tag = "Cards",
    responses(
        (status = 200, body = RevealedCard),
        (status = 403, description = "Not the owner, or wrong PIN"),
        (status = 404),
        (status = 409, description = "No account PIN set")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reveal_card(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path((user_id, card_id)): Path<(String, String)>,
    Json(request): Json<RevealCardRequest>,
) -> Result<Json<RevealedCard>, ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::forbidden("Only the card owner can reveal card details"));
    }

    let pin_hash = UserRepository::new(state.storage())
        .find(&user.user_id)?
        .and_then(|profile| profile.pin_hash)
        .ok_or_else(|| ApiError::conflict("Set an account PIN before revealing card details"))?;

    let card = CardRepository::new(state.storage()).get_owned(&card_id, &user_id)?;

    if !verify_pin(&request.pin, &pin_hash)? {
        tracing::warn!(user_id = %user.user_id, card_id = %card.id, "Card reveal with wrong PIN");
        audit_log!(
            state.storage(),
            AuditEvent::new(AuditEventType::CardRevealed)
                .with_user(&user.user_id)
                .with_resource("card", &card.id)
                .failed("Invalid PIN")
        );
        return Err(ApiError::forbidden("Invalid PIN"));
    }

    let cipher = state.cipher();
    let revealed = RevealedCard {
        id: card.id.clone(),
        number: card.reveal_number(cipher),
        cvv: card.reveal_cvv(cipher),
        pin: card.reveal_pin(cipher),
    };

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::CardRevealed)
            .with_user(&user.user_id)
            .with_resource("card", &card.id)
            .with_details(json!({ "fields": ["number", "cvv", "pin"] }))
    );

    Ok(Json(revealed))
}
