// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Support ticket repository.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{paths::validate_id, JsonStorage, OwnedResource, StorageError, StorageResult};
use crate::models::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// Support ticket as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredTicket {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl StoredTicket {
    pub fn new(user_id: &str, subject: &str, message: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subject: subject.trim().to_string(),
            message: message.trim().to_string(),
            status: TicketStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
            closed_by: None,
            resolution: None,
        }
    }
}

impl OwnedResource for StoredTicket {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }

    fn resource_kind(&self) -> &'static str {
        "ticket"
    }
}

impl From<StoredTicket> for Ticket {
    fn from(t: StoredTicket) -> Self {
        Ticket {
            id: t.id,
            user_id: t.user_id,
            subject: t.subject,
            message: t.message,
            status: t.status,
            created_at: t.created_at,
            closed_at: t.closed_at,
            closed_by: t.closed_by,
            resolution: t.resolution,
        }
    }
}

/// Repository for support tickets.
pub struct TicketRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> TicketRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    fn path(&self, ticket_id: &str) -> StorageResult<PathBuf> {
        validate_id(ticket_id)?;
        Ok(self.storage.paths().ticket(ticket_id))
    }

    pub fn exists(&self, ticket_id: &str) -> bool {
        self.path(ticket_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, ticket_id: &str) -> StorageResult<StoredTicket> {
        let path = self.path(ticket_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Ticket {ticket_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, ticket: &StoredTicket) -> StorageResult<()> {
        let path = self.path(&ticket.id)?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!("Ticket {}", ticket.id)));
        }
        self.storage.write_json(path, ticket)
    }

    /// Close an open ticket. Closing a closed ticket is a conflict.
    pub fn close(
        &self,
        ticket_id: &str,
        closed_by: &str,
        resolution: Option<&str>,
    ) -> StorageResult<StoredTicket> {
        let path = self.path(ticket_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Ticket {ticket_id}")));
        }

        self.storage.update_json(path, |ticket: &mut StoredTicket| {
            if ticket.status == TicketStatus::Closed {
                return Err(StorageError::AlreadyExists(format!(
                    "Ticket {ticket_id} is already closed"
                )));
            }
            ticket.status = TicketStatus::Closed;
            ticket.closed_at = Some(Utc::now());
            ticket.closed_by = Some(closed_by.to_string());
            ticket.resolution = resolution
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            Ok(ticket.clone())
        })
    }

    /// All tickets, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredTicket>> {
        let mut tickets: Vec<StoredTicket> =
            self.storage.load_all(self.storage.paths().tickets_dir())?;
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    pub fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<StoredTicket>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|ticket| ticket.user_id == user_id)
            .collect())
    }

    /// Delete closed tickets closed before `cutoff`. Returns how many were removed.
    pub fn purge_closed_before(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        let mut purged = 0;
        for ticket in self.list_all()? {
            let stale = ticket.status == TicketStatus::Closed
                && ticket.closed_at.is_some_and(|closed| closed < cutoff);
            if stale {
                self.storage.delete(self.path(&ticket.id)?)?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::test_support::outside_record;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, JsonStorage) {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        (temp, storage)
    }

    #[test]
    fn create_and_close_ticket() {
        let (_temp, storage) = test_storage();
        let repo = TicketRepository::new(&storage);

        let ticket = StoredTicket::new("user_1", " Card missing ", "I lost my card");
        repo.create(&ticket).unwrap();
        assert_eq!(repo.get(&ticket.id).unwrap().subject, "Card missing");

        let closed = repo.close(&ticket.id, "manager_1", Some("Reissued")).unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert_eq!(closed.closed_by.as_deref(), Some("manager_1"));
        assert_eq!(closed.resolution.as_deref(), Some("Reissued"));

        let again = repo.close(&ticket.id, "manager_1", None);
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn closing_unknown_ticket_is_not_found() {
        let (_temp, storage) = test_storage();
        let repo = TicketRepository::new(&storage);
        assert!(matches!(
            repo.close("nope", "admin_1", None),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn list_by_user_filters() {
        let (_temp, storage) = test_storage();
        let repo = TicketRepository::new(&storage);
        repo.create(&StoredTicket::new("user_1", "a", "a")).unwrap();
        repo.create(&StoredTicket::new("user_2", "b", "b")).unwrap();

        assert_eq!(repo.list_by_user("user_1").unwrap().len(), 1);
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn purge_removes_stale_closed_tickets_only() {
        let (_temp, storage) = test_storage();
        let repo = TicketRepository::new(&storage);
        let now = Utc::now();

        let mut stale = StoredTicket::new("user_1", "old", "old");
        stale.status = TicketStatus::Closed;
        stale.closed_at = Some(now - Duration::hours(25));
        repo.create(&stale).unwrap();

        let mut recent = StoredTicket::new("user_1", "recent", "recent");
        recent.status = TicketStatus::Closed;
        recent.closed_at = Some(now - Duration::hours(1));
        repo.create(&recent).unwrap();

        let open = StoredTicket::new("user_1", "open", "open");
        repo.create(&open).unwrap();

        let purged = repo.purge_closed_before(now - Duration::hours(24)).unwrap();
        assert_eq!(purged, 1);
        assert!(!repo.exists(&stale.id));
        assert!(repo.exists(&recent.id));
        assert!(repo.exists(&open.id));
    }

    #[test]
    fn ids_outside_the_data_dir_are_rejected() {
        let (_temp, storage) = test_storage();
        let repo = TicketRepository::new(&storage);
        let (_outside, id, victim) =
            outside_record(serde_json::json!({"id": "x", "userId": "user_1", "status": "open"}));

        assert!(matches!(repo.get(&id), Err(StorageError::InvalidId(_))));
        assert!(matches!(
            repo.close(&id, "admin_1", None),
            Err(StorageError::InvalidId(_))
        ));
        assert!(!repo.exists(&id));
        assert!(victim.exists());
    }
}
