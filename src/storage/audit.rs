// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Record mutations, PIN reveals, access-grant lifecycle and role changes are
//! appended to a daily JSONL file. Events never carry plaintext field values
//! or access tokens.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{JsonStorage, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Vault events
    CardCreated,
    CardUpdated,
    CardDeleted,
    CardRevealed,
    BankAccountCreated,
    BankAccountUpdated,
    BankAccountDeleted,
    AddressCreated,
    AddressUpdated,
    AddressDeleted,

    // Temporary access events
    AccessGranted,
    AccessConsumed,
    AccessDenied,

    // Account events
    PinChanged,
    RoleChanged,

    // Support events
    TicketCreated,
    TicketClosed,

    // Admin events
    AdminAccess,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (card id, grant id, etc.).
    pub resource_id: Option<String>,
    /// Resource type (card, access_grant, etc.).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> AuditRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Log an audit event.
    ///
    /// Events are appended to a daily log file in JSONL format.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);

        let mut line = serde_json::to_vec(event).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize audit event: {e}"))
        })?;
        line.push(b'\n');

        self.storage.append_raw(&path, &line)
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    ///
    /// A day without events yields an empty list.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let content = match self.storage.read_raw(&path) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let content = String::from_utf8(content).map_err(|e| {
            StorageError::SerializationError(format!("Invalid UTF-8 in audit log: {e}"))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    StorageError::SerializationError(format!(
                        "Failed to deserialize audit event: {e}"
                    ))
                })
            })
            .collect()
    }

    /// Read events for an inclusive date range.
    pub fn read_events_range(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;

        let mut all_events = Vec::new();
        let mut current = start;
        while current <= end {
            all_events.extend(self.read_events(&current.format("%Y-%m-%d").to_string())?);
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::SerializationError("Date overflow".to_string()))?;
        }

        Ok(all_events)
    }

    /// Events of one day triggered by `user_id`.
    pub fn search_by_user(&self, user_id: &str, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let events = self.read_events(date)?;
        Ok(events
            .into_iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .collect())
    }
}

fn parse_date(date: &str) -> StorageResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| StorageError::SerializationError(format!("Invalid date '{date}': {e}")))
}

/// Helper macro for logging audit events.
///
/// Failures to write the audit log are reported but never fail the request.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        if let Err(e) = repo.log(&$event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($storage:expr, $event_type:expr, $user:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.user_id)
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!($storage, event)
    }};
}
