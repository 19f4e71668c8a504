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
    models::{BankAccountView, CreateBankAccountRequest, UpdateBankAccountRequest},
    state::AppState,
    storage::{
        ensure_can_read, AuditEvent, AuditEventType, BankAccountRepository, GrantAction,
        StoredBankAccount,
    },
};

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/bank-accounts",
    params(("user_id" = String, Path, description = "Owner of the accounts")),
    tag = "Bank Accounts",
    responses((status = 200, body = [BankAccountView]), (status = 403)),
    security(("bearer_auth" = []))
)]
pub async fn list_bank_accounts(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BankAccountView>>, ApiError> {
    ensure_can_read(&user, &user_id)?;
    let accounts = BankAccountRepository::new(state.storage()).list_by_owner(&user_id)?;
    Ok(Json(
        accounts
            .iter()
            .map(|account| account.to_view(state.cipher()))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/bank-accounts",
    params(("user_id" = String, Path, description = "Owner of the new account")),
    request_body = CreateBankAccountRequest,
    tag = "Bank Accounts",
    responses((status = 201, body = BankAccountView), (status = 400), (status = 403)),
    security(("bearer_auth" = []))
)]
pub async fn create_bank_account(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path(user_id): Path<String>,
    Json(request): Json<CreateBankAccountRequest>,
) -> Result<(StatusCode, Json<BankAccountView>), ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Add, "bank_account")?;

    if request.account_number.trim().is_empty() {
        return Err(ApiError::bad_request("Account number is required"));
    }

    let account = StoredBankAccount::new(state.cipher(), &user_id, &request);
    BankAccountRepository::new(state.storage()).create(&account)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::BankAccountCreated)
            .with_user(&user.user_id)
            .with_resource("bank_account", &account.id)
            .with_details(decision_details(&decision))
    );

    Ok((StatusCode::CREATED, Json(account.to_view(state.cipher()))))
}

#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/bank-accounts/{account_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the account"),
        ("account_id" = String, Path, description = "Bank account identifier")
    ),
    request_body = UpdateBankAccountRequest,
    tag = "Bank Accounts",
    responses((status = 200, body = BankAccountView), (status = 403), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn update_bank_account(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, account_id)): Path<(String, String)>,
    Json(request): Json<UpdateBankAccountRequest>,
) -> Result<Json<BankAccountView>, ApiError> {
    let decision = authorize(&state, &user, &user_id, &token, GrantAction::Edit, "bank_account")?;

    let repo = BankAccountRepository::new(state.storage());
    let account = repo.update_owned(&account_id, &user_id, |account| {
        account.apply_update(state.cipher(), &request);
    })?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::BankAccountUpdated)
            .with_user(&user.user_id)
            .with_resource("bank_account", &account.id)
            .with_details(decision_details(&decision))
    );

    Ok(Json(account.to_view(state.cipher())))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}/bank-accounts/{account_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the account"),
        ("account_id" = String, Path, description = "Bank account identifier")
    ),
    tag = "Bank Accounts",
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer_auth" = []))
)]
pub async fn delete_bank_account(
    State(state): State<AppState>,
    Auth(user): Auth,
    token: PresentedAccessToken,
    Path((user_id, account_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let decision =
        authorize(&state, &user, &user_id, &token, GrantAction::Delete, "bank_account")?;

    let repo = BankAccountRepository::new(state.storage());
    let account = repo.get_owned(&account_id, &user_id)?;
    repo.delete(&account.id)?;

    audit_log!(
        state.storage(),
        AuditEvent::new(AuditEventType::BankAccountDeleted)
            .with_user(&user.user_id)
            .with_resource("bank_account", &account.id)
            .with_details(decision_details(&decision))
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::user_with_role;
    use crate::auth::Role;
    use crate::state::test_state;
    use crate::storage::repository::test_support::assert_no_sealed_keys;

    #[tokio::test]
    async fn manager_creates_and_updates_account() {
        let (state, _temp_dir) = test_state();
        let manager = user_with_role("manager_1", Role::Manager);

        let (status, Json(created)) = create_bank_account(
            State(state.clone()),
            Auth(manager.clone()),
            PresentedAccessToken(None),
            Path("user_1".to_string()),
            Json(CreateBankAccountRequest {
                account_holder: Some("Ada Lovelace".to_string()),
                account_number: "001234567890".to_string(),
                ifsc: Some("HDFC0001234".to_string()),
                branch: Some("Main Street".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.account_number.as_deref(), Some("001234567890"));
        assert_no_sealed_keys(&serde_json::to_value(&created).unwrap());

        let Json(updated) = update_bank_account(
            State(state),
            Auth(manager),
            PresentedAccessToken(None),
            Path(("user_1".to_string(), created.id.clone())),
            Json(UpdateBankAccountRequest {
                ifsc: Some(String::new()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert!(updated.ifsc.is_none());
        assert_eq!(updated.account_holder.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let (state, _temp_dir) = test_state();
        let err = delete_bank_account(
            State(state),
            Auth(user_with_role("admin_1", Role::Admin)),
            PresentedAccessToken(None),
            Path(("user_1".to_string(), "missing".to_string())),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
