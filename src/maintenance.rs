// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Maintenance Sweeper
//!
//! Background task that removes records past their retention window:
//!
//! - access grants created more than 7 days ago, whatever their state
//! - support tickets closed more than 24 hours ago
//!
//! Every `sweep_interval` (default 1 h) the sweeper runs one pass. A failure
//! in one purge is logged and does not stop the other.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; `main` cancels it once the
//! server has stopped accepting connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::auth::TemporaryAccessService;
use crate::storage::{JsonStorage, TicketRepository};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Closed tickets are kept this long after closing.
pub const CLOSED_TICKET_RETENTION_HOURS: i64 = 24;

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub grants_purged: usize,
    pub tickets_purged: usize,
}

pub struct MaintenanceSweeper {
    storage: Arc<JsonStorage>,
    public_app_url: Arc<Url>,
    sweep_interval: Duration,
}

impl MaintenanceSweeper {
    pub fn new(storage: Arc<JsonStorage>, public_app_url: Arc<Url>) -> Self {
        Self {
            storage,
            public_app_url,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Maintenance sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let report = self.run_once(Utc::now());
            if report != SweepReport::default() {
                info!(
                    grants_purged = report.grants_purged,
                    tickets_purged = report.tickets_purged,
                    "Maintenance sweep removed stale records"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Maintenance sweeper shutting down");
    }

    /// One sweep as of `now`.
    pub fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let grants_purged = TemporaryAccessService::new(&self.storage, &self.public_app_url)
            .purge_expired(now)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to purge access grants");
                0
            });

        let cutoff = now - chrono::Duration::hours(CLOSED_TICKET_RETENTION_HOURS);
        let tickets_purged = TicketRepository::new(&self.storage)
            .purge_closed_before(cutoff)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to purge closed tickets");
                0
            });

        SweepReport {
            grants_purged,
            tickets_purged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        AccessGrantRepository, GrantPermissions, GrantType, StoredAccessGrant, StoredTicket,
    };
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, MaintenanceSweeper) {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        let url = Url::parse("http://localhost:3000").unwrap();
        let sweeper = MaintenanceSweeper::new(Arc::new(storage), Arc::new(url));
        (temp, sweeper)
    }

    fn grant_created_at(id: &str, created_at: DateTime<Utc>) -> StoredAccessGrant {
        StoredAccessGrant {
            id: id.to_string(),
            user_id: "user_1".to_string(),
            token: format!("{id:0>64}"),
            grant_type: GrantType::EditProfile,
            expires_at: created_at + ChronoDuration::minutes(15),
            used: false,
            permissions: GrantPermissions::default(),
            started_at: created_at,
            duration: 900,
            created_at,
            issued_by: "admin_1".to_string(),
        }
    }

    #[test]
    fn sweep_removes_old_grants_only() {
        let (_temp, sweeper) = setup();
        let now = Utc::now();
        let grants = AccessGrantRepository::new(&sweeper.storage);
        grants
            .create(&grant_created_at("old", now - ChronoDuration::days(8)))
            .unwrap();
        grants
            .create(&grant_created_at("recent", now - ChronoDuration::days(1)))
            .unwrap();

        let report = sweeper.run_once(now);

        assert_eq!(report.grants_purged, 1);
        assert!(!grants.exists("old"));
        assert!(grants.exists("recent"));
    }

    #[test]
    fn sweep_removes_tickets_closed_over_a_day_ago() {
        let (_temp, sweeper) = setup();
        let tickets = TicketRepository::new(&sweeper.storage);

        let open = StoredTicket::new("user_1", "Card missing", "Cannot see my card");
        tickets.create(&open).unwrap();

        let mut stale = StoredTicket::new("user_1", "Old", "Resolved long ago");
        tickets.create(&stale).unwrap();
        stale = tickets.close(&stale.id, "admin_1", None).unwrap();

        let recent = StoredTicket::new("user_2", "New", "Just resolved");
        tickets.create(&recent).unwrap();
        tickets.close(&recent.id, "admin_1", Some("Fixed")).unwrap();

        assert_eq!(sweeper.run_once(Utc::now()).tickets_purged, 0);

        let later = stale.closed_at.unwrap() + ChronoDuration::hours(25);
        let report = sweeper.run_once(later);

        assert_eq!(report.tickets_purged, 2);
        assert!(tickets.exists(&open.id));
        assert!(!tickets.exists(&stale.id));
    }

    #[test]
    fn empty_storage_sweeps_cleanly() {
        let (_temp, sweeper) = setup();
        assert_eq!(sweeper.run_once(Utc::now()), SweepReport::default());
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_temp, sweeper) = setup();
        let sweeper = sweeper.with_interval(Duration::from_secs(3600));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(sweeper.run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper stops after cancellation")
            .unwrap();
    }
}
