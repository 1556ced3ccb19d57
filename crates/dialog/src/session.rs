use std::time::{Duration, Instant};

/// Where a capture dialog currently stands.
///
/// The draft title rides inside the state so a payload-collecting state
/// cannot exist without one. `Idle` is the absence of a [`Session`];
/// Saved/Cancelled destroy the session instead of being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    AwaitingTitle,
    AwaitingAttachmentChoice { title: String },
    AwaitingMediaPayload { title: String },
    AwaitingLinkPayload { title: String },
}

/// Transient per-owner dialog state. At most one per owner.
#[derive(Debug)]
pub struct Session {
    pub state: DialogState,
    last_activity: Instant,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DialogState::AwaitingTitle,
            last_activity: Instant::now(),
        }
    }

    /// Record activity, deferring TTL expiry.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    #[must_use]
    pub fn expired(&self, ttl: Duration) -> bool {
        self.last_activity.elapsed() >= ttl
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_awaits_a_title() {
        let session = Session::new();
        assert_eq!(session.state, DialogState::AwaitingTitle);
        assert!(!session.expired(Duration::from_secs(60)));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let session = Session::new();
        assert!(session.expired(Duration::ZERO));
    }
}
