//! In-game presence tracking.
//!
//! The presence set is the set of nicknames currently inside the match
//! engine. It serves two purposes: a readiness signal ("my opponent has
//! joined") and a liveness signal ("my opponent is still here"). Waiters are
//! woken through a [`Notify`] rather than a fixed-sleep poll, with the same
//! fixed-budget timeout semantics.

use dashmap::DashSet;
use tokio::sync::Notify;
use tokio::time::{self, Duration, Instant};
use tracing::trace;

/// Concurrently accessible set of in-game nicknames.
///
/// Membership operations are single atomic steps; `wait_for` observes every
/// membership change without a polling interval bounding its latency.
#[derive(Debug, Default)]
pub struct PresenceSet {
    members: DashSet<String>,
    changed: Notify,
}

impl PresenceSet {
    /// Creates an empty presence set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a nickname as in-game and wakes all waiters.
    pub fn mark(&self, nickname: &str) {
        self.members.insert(nickname.to_string());
        self.changed.notify_waiters();
        trace!("🎮 '{}' entered a match", nickname);
    }

    /// Clears a nickname's in-game marker and wakes all waiters.
    ///
    /// Waiters are notified on removal too so an opponent's departure is
    /// observed without waiting out a full timeout cycle.
    pub fn clear(&self, nickname: &str) {
        self.members.remove(nickname);
        self.changed.notify_waiters();
        trace!("🎮 '{}' left a match", nickname);
    }

    /// Whether a nickname is currently in-game.
    pub fn contains(&self, nickname: &str) -> bool {
        self.members.contains(nickname)
    }

    /// Waits up to `timeout` for a nickname to appear in the set.
    ///
    /// Returns `true` as soon as the nickname is present, `false` once the
    /// budget is exhausted. The notified future is created before each
    /// membership check so a concurrent `mark` cannot be missed.
    pub async fn wait_for(&self, nickname: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            if self.contains(nickname) {
                return true;
            }
            if time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}
