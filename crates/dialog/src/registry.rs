use std::{sync::Arc, time::Duration};

use {dashmap::DashMap, tokio::sync::Mutex, tracing::debug};

use crate::session::Session;

/// A slot holds at most one live session for one owner. Handlers lock the
/// slot for the whole turn, which gives FIFO ordering per owner without
/// serializing different owners against each other.
pub type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Mapping from owner id to that owner's dialog session.
///
/// Sessions are created by the entry command and destroyed on terminal
/// transitions; abandoned ones are expired after an idle TTL by
/// [`SessionRegistry::sweep`] and lazily by the controller on access.
pub struct SessionRegistry {
    slots: DashMap<i64, SessionSlot>,
    ttl: Duration,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get or create the slot for an owner.
    #[must_use]
    pub fn slot(&self, owner_id: i64) -> SessionSlot {
        self.slots.entry(owner_id).or_default().clone()
    }

    /// Number of owners with a live (non-expired) session. Test and
    /// diagnostics helper.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .is_ok_and(|guard| guard.as_ref().is_some_and(|s| !s.expired(self.ttl)))
            })
            .count()
    }

    /// Drop expired sessions and empty slots. Returns how many sessions
    /// were expired.
    ///
    /// A slot still referenced by a handler (strong count > 1) or currently
    /// locked is left alone; it will be picked up by a later sweep or by
    /// lazy expiry on the next turn.
    pub fn sweep(&self) -> usize {
        let mut expired = 0;
        self.slots.retain(|owner_id, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(mut guard) = slot.try_lock() else {
                return true;
            };
            if let Some(session) = guard.as_ref()
                && session.expired(self.ttl)
            {
                debug!(owner_id, "expiring idle dialog session");
                *guard = None;
                expired += 1;
            }
            guard.is_some()
        });
        expired
    }
}
