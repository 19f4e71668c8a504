// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::pin::PinError;
use crate::auth::AuthError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Machine-readable reason, set for authentication and access-gate rejections.
    pub error_code: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Generic 500. Details belong in the log, not the response.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => Self::not_found(format!("Not found: {what}")),
            StorageError::AlreadyExists(what) => Self::conflict(what),
            StorageError::PermissionDenied { .. } => Self::forbidden("Access denied"),
            StorageError::InvalidId(id) => Self::bad_request(format!("Invalid id: {id}")),
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                Self::internal()
            }
        }
    }
}

impl From<PinError> for ApiError {
    fn from(e: PinError) -> Self {
        match e {
            PinError::InvalidFormat => Self::unprocessable(e.to_string()),
            PinError::Hash(detail) => {
                tracing::error!(error = %detail, "PIN hashing failed");
                Self::internal()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Storage(inner) => Self::from(inner),
            AuthError::KeySet(detail) => {
                tracing::error!(error = %detail, "Signing keys unavailable");
                Self {
                    error_code: Some("auth_unavailable"),
                    ..Self::internal()
                }
            }
            rejected => Self {
                status: rejected.status_code(),
                error_code: Some(rejected.error_code()),
                message: rejected.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let forbidden = ApiError::forbidden("no");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let internal = ApiError::internal();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (StorageError::NotFound("Card c1".into()), StatusCode::NOT_FOUND),
            (StorageError::AlreadyExists("Card c1".into()), StatusCode::CONFLICT),
            (
                StorageError::PermissionDenied {
                    user_id: "u".into(),
                    resource: "card".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (StorageError::InvalidId("../x".into()), StatusCode::BAD_REQUEST),
            (StorageError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(StorageError::SerializationError("/data/secret/path".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn auth_errors_carry_a_code() {
        let err = ApiError::from(AuthError::AccessTokenRequired);
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error_code, Some("access_token_required"));

        let err = ApiError::from(AuthError::MissingBearer);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code, Some("missing_auth_header"));

        let err = ApiError::from(AuthError::Storage(StorageError::LockPoisoned));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code, None);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
