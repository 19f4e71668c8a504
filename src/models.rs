// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`/`Deserialize` and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Views vs. stored records
//!
//! Stored records (in `storage::repository`) hold sealed fields as
//! ciphertext/IV pairs. The views here are what clients receive: decrypted
//! or masked values only. They have no fields for ciphertext or IVs, so a
//! view can never leak one.
//!
//! ## Model Categories
//!
//! - **Cards**, **Bank Accounts**, **Addresses**: vault records
//! - **Users**: profile, PIN and role management
//! - **Tickets**: support requests
//! - **Access**: temporary access grants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::repository::{GrantPermissions, GrantType, TicketStatus};

// =============================================================================
// Card Models
// =============================================================================

/// A payment card as shown to clients.
///
/// The number is always masked; CVV and card PIN are replaced by fixed
/// placeholders. Real values are only returned by the reveal endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CardView {
    pub id: String,
    pub user_id: String,
    /// Masked number, e.g. `**** **** **** 1111`.
    pub number: Option<String>,
    pub last4: Option<String>,
    /// `***` when a CVV is stored.
    pub cvv: Option<String>,
    pub holder: Option<String>,
    pub expiry: Option<String>,
    /// `****` when a card PIN is stored.
    pub pin: Option<String>,
    pub bank: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub theme: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to store a new card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateCardRequest {
    pub number: String,
    pub cvv: Option<String>,
    pub holder: Option<String>,
    /// Expiry as entered, e.g. `12/29`.
    pub expiry: Option<String>,
    pub pin: Option<String>,
    pub bank: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub theme: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Partial card update.
///
/// Omitted fields are left untouched; an empty string clears a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCardRequest {
    pub number: Option<String>,
    pub cvv: Option<String>,
    pub holder: Option<String>,
    pub expiry: Option<String>,
    pub pin: Option<String>,
    pub bank: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub theme: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Request to reveal a card's secret fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevealCardRequest {
    /// The account PIN of the requesting user.
    pub pin: String,
}

/// Decrypted secret fields of a card.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevealedCard {
    pub id: String,
    pub number: Option<String>,
    pub cvv: Option<String>,
    pub pin: Option<String>,
}

// =============================================================================
// Bank Account Models
// =============================================================================

/// A bank account as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BankAccountView {
    pub id: String,
    pub user_id: String,
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub ifsc: Option<String>,
    pub branch: Option<String>,
    pub account_type: Option<String>,
    pub theme: Option<String>,
    pub mmid: Option<String>,
    pub vpa: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to store a new bank account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateBankAccountRequest {
    pub account_holder: Option<String>,
    pub account_number: String,
    pub ifsc: Option<String>,
    pub branch: Option<String>,
    pub account_type: Option<String>,
    pub theme: Option<String>,
    pub mmid: Option<String>,
    pub vpa: Option<String>,
}

/// Partial bank account update. Omitted fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBankAccountRequest {
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub ifsc: Option<String>,
    pub branch: Option<String>,
    pub account_type: Option<String>,
    pub theme: Option<String>,
    pub mmid: Option<String>,
    pub vpa: Option<String>,
}

// =============================================================================
// Address Models
// =============================================================================

/// A postal address as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AddressView {
    pub id: String,
    pub user_id: String,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub landmark: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to store a new address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub line1: String,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub landmark: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Partial address update. Omitted fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAddressRequest {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub landmark: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

// =============================================================================
// User Models
// =============================================================================

/// The caller's own profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub user_id: String,
    /// Effective role (stored role overrides the token claim).
    pub role: Role,
    /// Whether an account PIN has been set.
    pub has_pin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A stored user profile (admin listing).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub user_id: String,
    pub role: Role,
    pub has_pin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to set or replace the account PIN.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetPinRequest {
    /// 4 to 6 digits.
    pub pin: String,
}

/// Request to change a user's role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// =============================================================================
// Support Ticket Models
// =============================================================================

/// A support ticket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Request to open a support ticket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

/// Request to close a support ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CloseTicketRequest {
    pub resolution: Option<String>,
}

// =============================================================================
// Temporary Access Models
// =============================================================================

/// Request to issue a temporary access grant for a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccessGrantRequest {
    /// The user whose records the grant unlocks.
    pub user_id: String,
    /// Defaults to `edit_profile`.
    #[serde(default, rename = "type")]
    pub grant_type: Option<GrantType>,
    /// Defaults to add/edit/delete all allowed.
    #[serde(default)]
    pub permissions: Option<GrantPermissions>,
}

/// A freshly issued grant. The token is shown exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessGrantResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Link to hand to the user, e.g. `https://app/access/edit?token=...`.
    pub link: String,
}

/// Body carrying an access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenRequest {
    pub token: String,
}

/// Result of verifying an access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VerifyAccessResponse {
    pub valid: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<GrantType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Result of consuming an access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ConsumeAccessResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_type_uses_type_key() {
        let request: CreateCardRequest =
            serde_json::from_str(r#"{"number":"4111111111111111","type":"visa"}"#).unwrap();
        assert_eq!(request.card_type.as_deref(), Some("visa"));
        assert!(request.cvv.is_none());
    }

    #[test]
    fn access_grant_request_defaults() {
        let request: CreateAccessGrantRequest =
            serde_json::from_str(r#"{"user_id":"user_1"}"#).unwrap();
        assert!(request.grant_type.is_none());
        assert!(request.permissions.is_none());
    }

    #[test]
    fn invalid_verify_response_omits_details() {
        let json = serde_json::to_value(VerifyAccessResponse {
            valid: false,
            grant_type: None,
            user_id: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "valid": false }));
    }
}
