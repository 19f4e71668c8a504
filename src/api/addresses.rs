// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{authorize, decision_details};
use crate::{
    audit_log,
    auth::{Auth, PresentedAccessToken},
    error::ApiError,
    models::{AddressView, CreateAddressRequest, UpdateAddressRequest},
    state::AppState,
    storage::{
        ensure_can_read, AddressRepository, AuditEvent, AuditEventType, GrantAction, StoredAddress,
    },
};

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/addresses",
    params(("user_id" = String, Path, description = "Owner of the addresses")),
    tag = "Addresses",
    responses((status = 200, body = [AddressView]), (status = 403)),
    security(("bearer_auth" = []))
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<AddressView>>, ApiError> {
    ensure_can_read(&user, &user_id)?;
    let addresses = AddressRepository::new(state.storage()).list_by_owner(&user_id)?;
    Ok(Json(
        addresses
            .iter()
            .map(|address| address.to_view(state.cipher()))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/addresses",
    params(("user_id" = String, Path, description = "Owner of the new address")),
    request_body = CreateAddressRequest,
    tag = "Addresses",
    responses((status = 201, body = AddressView), (status = 400), (status = 403)),
    security(("bearer_auth" = []))
)]
pub async fn create_address(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path(user_id): Path<String>,
    Json(request): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressView>), ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Add, "address")?;

    if request.line1.trim().is_empty() {
        return Err(ApiError::bad_request("Address line 1 is required"));
    }

    let address = StoredAddress::new(state.cipher(), &user_id, &request);
    AddressRepository::new(state.storage()).create(&address)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AddressCreated)
            .with_user(&user.user_id)
            .with_resource("address", &address.id)
            .with_details(decision_details(&decision))
    );

    Ok((StatusCode::CREATED, Json(address.to_view(state.cipher()))))
}

#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/addresses/{address_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the address"),
        ("address_id" = String, Path, description = "Address identifier")
    ),
    request_body = UpdateAddressRequest,
    tag = "Addresses",
    responses((status = 200, body = AddressView), (status = 403), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn update_address(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, address_id)): Path<(String, String)>,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<Json<AddressView>, ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Edit, "address")?;

    let repo = AddressRepository::new(state.storage());
    let address = repo.update_owned(&address_id, &user_id, |address| {
        address.apply_update(state.cipher(), &request);
    })?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AddressUpdated)
            .with_user(&user.user_id)
            .with_resource("address", &address.id)
            .with_details(decision_details(&decision))
    );

    Ok(Json(address.to_view(state.cipher())))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}/addresses/{address_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the address"),
        ("address_id" = String, Path, description = "Address identifier")
    ),
    tag = "Addresses",
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn delete_address(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, address_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Delete, "address")?;

    let repo = AddressRepository::new(state.storage());
    let address = repo.get_owned(&address_id, &user_id)?;
    repo.delete(&address.id)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::AddressDeleted)
            .with_user(&user.user_id)
            .with_resource("address", &address.id)
            .with_details(decision_details(&decision))
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{issue_grant, user_with_role};
    use crate::auth::Role;
    use crate::state::test_state;
    use crate::storage::{AuditRepository, GrantPermissions};

    fn home() -> CreateAddressRequest {
        CreateAddressRequest {
            line1: "12 Analytical Way".to_string(),
            city: Some("London".to_string()),
            zip_code: Some("N1 9GU".to_string()),
            country: Some("UK".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn owner_with_grant_manages_addresses() {
        let (state, _temp_dir) = test_state();
        let token = issue_grant(&state, "user_1", GrantPermissions::default());
        let owner = user_with_role("user_1", Role::User);

        let (_, Json(created)) = create_address(
            State(state.clone()),
            Auth(owner.clone()),
            PresentedAccessToken(Some(token.clone())),
            Path("user_1".to_string()),
            Json(home()),
        )
        .await
        .unwrap();
        assert_eq!(created.line1.as_deref(), Some("12 Analytical Way"));
        assert_eq!(created.country.as_deref(), Some("UK"));

        let status = delete_address(
            State(state.clone()),
            Auth(owner.clone()),
            PresentedAccessToken(Some(token)),
            Path(("user_1".to_string(), created.id.clone())),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(remaining) = list_addresses(State(state), Auth(owner), Path("user_1".into()))
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn grant_for_another_user_is_rejected_and_audited() {
        let (state, _temp_dir) = test_state();
        let token = issue_grant(&state, "user_2", GrantPermissions::default());

        let err = create_address(
            State(state.clone()),
            Auth(user_with_role("user_1", Role::User)),
            PresentedAccessToken(Some(token)),
            Path("user_1".to_string()),
            Json(home()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code, Some("invalid_access_token"));

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let events = AuditRepository::new(state.storage())
            .search_by_user("user_1", &today)
            .unwrap();
        assert!(events
            .iter()
            .any(|e| e.event_type == AuditEventType::AccessDenied && !e.success));
    }
}
