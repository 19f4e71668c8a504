// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication and Authorization
//!
//! ## Auth Flow
//!
//! 1. The frontend authenticates the user with the identity provider
//! 2. The frontend sends `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - verifies the JWT against the provider's JWKS (or decodes it unsigned
//!      in development mode)
//!    - takes `sub` as the canonical `user_id`
//!    - resolves the role: stored profile role, else `publicMetadata.role`
//!
//! ## Authorization
//!
//! - Reads of vault records: owner, admin or manager
//! - Mutations of vault records: admin or manager, or the owner holding a
//!   temporary access grant (`access`, `temp_access`)
//! - Card secret reveal: owner re-entering the account PIN (`pin`)

pub mod access;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod pin;
pub mod roles;
pub mod temp_access;

pub use access::{authorize_mutation, AccessDecision, PresentedAccessToken};
pub use claims::AuthenticatedUser;
pub use error::{AuthError, TokenRejection};
pub use extractor::{AdminOnly, Auth, PrivilegedOnly};
pub use jwks::JwksManager;
pub use roles::Role;
pub use temp_access::{IssuedGrant, TemporaryAccessService, VerifyOutcome};
