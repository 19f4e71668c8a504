// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage as one JSON document per record under `DATA_DIR`.
//! Sensitive record fields are already ciphertext when they reach this layer
//! (see `crate::crypto`); storage itself never sees plaintext secrets.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   users/{user_id}.json           # role + PIN hash
//!   cards/{card_id}.json           # sealed number, CVV, holder, expiry, PIN, bank
//!   bank_accounts/{id}.json        # sealed holder, number, IFSC
//!   addresses/{id}.json            # sealed line1, line2, city, ZIP
//!   access_grants/{grant_id}.json  # temporary access grants
//!   tickets/{ticket_id}.json       # support tickets
//!   audit/
//!     {date}/events.jsonl          # daily audit logs
//! ```

pub mod audit;
pub mod json_fs;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use json_fs::{JsonStorage, StorageError, StorageResult};
pub use ownership::{ensure_can_read, OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use repository::{
    AccessGrantRepository, AddressRepository, BankAccountRepository, CardRepository,
    ConsumeOutcome, GrantAction, GrantPermissions, GrantType, StoredAccessGrant, StoredAddress,
    StoredBankAccount, StoredCard, StoredTicket, StoredUser, TicketRepository, TicketStatus,
    UserRepository,
};
