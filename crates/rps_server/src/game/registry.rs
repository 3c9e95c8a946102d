//! Shared state for in-flight matches.
//!
//! Each match is a single [`LiveMatch`] entry keyed by [`MatchId`]. Both
//! players hold the same `Arc` to it, post their moves into it, and race to
//! resolve it. The entry is ephemeral: it is created when the first player
//! enters and removed by whichever player resolves the round, so a stale id
//! never pins memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use super::rules::Move;
use super::MatchId;

/// Move tracking for one in-flight match.
#[derive(Debug, Default)]
pub struct LiveMatch {
    /// Submitted moves, keyed by nickname. Each player writes at most one.
    moves: Mutex<HashMap<String, Move>>,
    /// Pinged whenever a move lands, waking the waiting resolver.
    move_posted: Notify,
    /// Held by the player currently resolving the round. Resolution happens
    /// exactly once because the entry is removed from the registry while
    /// this lock is held.
    resolve: tokio::sync::Mutex<()>,
}

impl LiveMatch {
    /// Records a player's move and wakes anyone waiting for it.
    pub fn submit(&self, nickname: &str, choice: Move) {
        self.moves
            .lock()
            .expect("match move table poisoned")
            .insert(nickname.to_string(), choice);
        self.move_posted.notify_waiters();
    }

    /// Both moves, if both players have submitted.
    ///
    /// Requires two entries in the table, so a match whose two names are
    /// the same nickname never resolves off a single submission.
    pub fn moves_for(&self, a: &str, b: &str) -> Option<(Move, Move)> {
        let moves = self.moves.lock().expect("match move table poisoned");
        if moves.len() < 2 {
            return None;
        }
        Some((*moves.get(a)?, *moves.get(b)?))
    }

    /// Waits until both players have posted a move, up to `timeout`.
    ///
    /// The notified future is created before each check so a submission
    /// landing between check and await still wakes us.
    pub async fn wait_for_moves(&self, a: &str, b: &str, timeout: Duration) -> Option<(Move, Move)> {
        let deadline = Instant::now() + timeout;
        loop {
            let posted = self.move_posted.notified();
            if let Some(pair) = self.moves_for(a, b) {
                return Some(pair);
            }
            if time::timeout_at(deadline, posted).await.is_err() {
                return self.moves_for(a, b);
            }
        }
    }

    /// Takes the resolution lock. The holder decides the round.
    pub async fn lock_for_resolve(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.resolve.lock().await
    }
}

/// All matches currently in flight.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    matches: DashMap<MatchId, Arc<LiveMatch>>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the match with the given id, creating it if this player is the
    /// first to arrive. Both players get the same `Arc`.
    pub fn enter(&self, id: MatchId) -> Arc<LiveMatch> {
        self.matches.entry(id).or_default().clone()
    }

    /// Whether the match is still in flight (not yet resolved or torn down).
    pub fn contains(&self, id: &MatchId) -> bool {
        self.matches.contains_key(id)
    }

    /// Removes the match entry. Idempotent.
    pub fn remove(&self, id: &MatchId) {
        self.matches.remove(id);
    }

    /// Number of matches currently in flight.
    pub fn live_count(&self) -> usize {
        self.matches.len()
    }
}
