//! Session lifecycle: opening, closing and restarting per-app usage
//! sessions against the store.

mod packages;

pub use packages::PackageClassifier;

use std::sync::Arc;

use log::{error, info, warn};

use crate::{
    db::{Database, UsageSession},
    utils::{app_label, clock::Clock},
};

/// Two closes inside this window are treated as one; the second is dropped.
pub const MIN_CLOSE_INTERVAL_MS: i64 = 1_000;

/// Open sessions older than this are closed and reopened to keep single
/// records from spanning forgotten, hours-long foreground stretches.
pub const MAX_SESSION_AGE_MS: i64 = 3_600_000;

/// Read-only view of the active session, shared with banner rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub package_name: String,
    pub app_name: String,
    pub start_time_ms: i64,
}

impl SessionInfo {
    pub fn duration_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.start_time_ms).max(0)
    }
}

/// Owns the single active [`UsageSession`] and its persistence.
///
/// All methods are called from one task, so there is no interior locking;
/// the in-memory record only becomes active once the insert round-trip has
/// assigned it a rowid.
pub struct SessionTracker {
    db: Database,
    clock: Arc<dyn Clock>,
    active: Option<UsageSession>,
    last_close_ms: i64,
}

impl SessionTracker {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            active: None,
            last_close_ms: 0,
        }
    }

    pub fn active_package(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.package_name.as_str())
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Age of the active session, or `None` when idle.
    pub fn session_age_ms(&self) -> Option<i64> {
        let session = self.active.as_ref()?;
        Some(session.duration_ms(self.clock.now_ms()))
    }

    pub fn snapshot(&self) -> Option<SessionInfo> {
        self.active.as_ref().map(|session| SessionInfo {
            package_name: session.package_name.clone(),
            app_name: app_label(&session.package_name),
            start_time_ms: session.start_time,
        })
    }

    /// Opens a session for `package_name`, persisting it before it becomes
    /// active. On a failed insert the tracker stays idle rather than
    /// accumulating time it can never account for.
    pub async fn open(&mut self, package_name: &str) -> Option<SessionInfo> {
        let now = self.clock.now_ms();
        let mut session = UsageSession::open(package_name, now);

        match self.db.insert_session(&session).await {
            Ok(id) => {
                session.id = id;
                info!("Session {id} started for {package_name}");
                self.active = Some(session);
                self.snapshot()
            }
            Err(e) => {
                error!("Failed to persist new session for {package_name}: {e:#}");
                self.active = None;
                None
            }
        }
    }

    /// Closes the active session, if any. Returns true when a session
    /// actually ended.
    ///
    /// Closes arriving within [`MIN_CLOSE_INTERVAL_MS`] of the previous one
    /// are dropped so overlapping exit signals (focus change plus poller)
    /// do not double-fire downstream teardown.
    pub async fn close(&mut self) -> bool {
        let now = self.clock.now_ms();
        if now - self.last_close_ms < MIN_CLOSE_INTERVAL_MS {
            info!("Ignoring close within {MIN_CLOSE_INTERVAL_MS}ms of the previous one");
            return false;
        }

        let Some(mut session) = self.active.take() else {
            return false;
        };

        session.end_time = Some(now);
        self.last_close_ms = now;

        match self.db.update_session(&session).await {
            Ok(()) => {
                info!(
                    "Session {} closed for {} after {}ms",
                    session.id,
                    session.package_name,
                    session.duration_ms(now)
                );
            }
            Err(e) => {
                // The in-memory session is gone either way; a stale open row
                // is excluded from sums by the 24h guard and swept at startup.
                warn!(
                    "Failed to persist close of session {} ({}): {e:#}",
                    session.id, session.package_name
                );
            }
        }
        true
    }
}
