// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Digital Wallet - Encrypted Personal Vault Service
//!
//! Users keep payment cards, bank accounts and addresses whose sensitive
//! fields are encrypted one by one (AES-256-CBC, fresh IV per field) before
//! they are written to disk. Support staff can hand a user a short-lived
//! access token that unlocks editing of their own records.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT authentication, roles, account PIN, temporary access grants
//! - `crypto` - Field cipher and sealed-field helpers
//! - `maintenance` - Background purge of expired grants and closed tickets
//! - `storage` - JSON file storage, repositories, audit log

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod state;
pub mod storage;
