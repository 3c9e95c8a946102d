//! The per-player match loop.
//!
//! Each player in a match runs this state machine on their own connection
//! task: wait for the opponent to enter, collect a move from the player's
//! input, then race the opponent to resolve the round. Whichever player
//! takes the resolution lock first announces the result to both sides and
//! removes the match entry; the other finds the entry gone and returns to
//! chat silently.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::ServerConfig;
use crate::session::{ConnectionId, PresenceSet, SessionRegistry, SessionState};

use super::rules::{self, Move};
use super::{MatchId, MatchRegistry};

/// Where a player's input lines come from during a match.
///
/// The connection handler implements this over the TCP read half; tests
/// drive the engine with scripted sources.
pub trait LineSource: Send {
    fn next_line(&mut self) -> impl std::future::Future<Output = io::Result<Option<String>>> + Send;
}

/// How a match ended, from this player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// This player resolved the round and announced the result
    Resolved,
    /// The opponent resolved first; nothing left to do
    AlreadyResolved,
    /// The opponent never entered the match within the join budget
    OpponentNeverJoined,
    /// The opponent went idle or disconnected mid-match
    OpponentGone,
    /// This player's own connection closed
    Disconnected,
}

/// Runs matches against the shared registries.
pub struct MatchEngine {
    sessions: Arc<SessionRegistry>,
    presence: Arc<PresenceSet>,
    matches: Arc<MatchRegistry>,
    join_wait: Duration,
    move_wait: Duration,
}

impl MatchEngine {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        presence: Arc<PresenceSet>,
        matches: Arc<MatchRegistry>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            sessions,
            presence,
            matches,
            join_wait: config.join_wait(),
            move_wait: config.move_wait(),
        }
    }

    /// Plays one match for `nickname` against `opponent`, reading this
    /// player's moves from `lines`. Always leaves the registries clean:
    /// the player's presence mark, session state and the match entry are
    /// torn down on every exit path.
    pub async fn run<S: LineSource>(
        &self,
        conn_id: ConnectionId,
        nickname: &str,
        opponent: &str,
        lines: &mut S,
    ) -> MatchOutcome {
        let id = MatchId::new(nickname, opponent);
        let game = self.matches.enter(id.clone());
        self.presence.mark(nickname);
        self.sessions
            .set_state(conn_id, SessionState::AwaitingOpponentJoin)
            .await;
        debug!("🎮 {} entered match {}", nickname, id);

        let outcome = self
            .play(conn_id, nickname, opponent, &id, &game, lines)
            .await;

        // Unconditional teardown. The entry is ephemeral, so removing an
        // already-removed match is a no-op.
        self.matches.remove(&id);
        self.presence.clear(nickname);
        self.sessions.set_state(conn_id, SessionState::Idle).await;
        debug!("🎮 {} left match {} ({:?})", nickname, id, outcome);
        outcome
    }

    async fn play<S: LineSource>(
        &self,
        conn_id: ConnectionId,
        nickname: &str,
        opponent: &str,
        id: &MatchId,
        game: &super::LiveMatch,
        lines: &mut S,
    ) -> MatchOutcome {
        self.notify(conn_id, "> Waiting for opponent to join...").await;
        if !self.presence.wait_for(opponent, self.join_wait).await {
            self.notify(conn_id, "> Opponent hasn't joined.").await;
            return MatchOutcome::OpponentNeverJoined;
        }

        self.sessions
            .set_state(conn_id, SessionState::InMatch)
            .await;
        self.notify(
            conn_id,
            "> Welcome to RPS! Choose one of [ROCK, PAPER, SCISSORS].",
        )
        .await;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => return MatchOutcome::Disconnected,
            };

            // The opponent may have vanished while we were reading.
            if !self.presence.contains(opponent)
                || !self.sessions.is_online(opponent).await
                || !self.matches.contains(id)
            {
                self.opponent_missing(conn_id).await;
                return MatchOutcome::OpponentGone;
            }

            match line.parse::<Move>() {
                Ok(choice) => {
                    game.submit(nickname, choice);
                    break;
                }
                Err(()) => {
                    self.notify(
                        conn_id,
                        "> Invalid Move. Possible commands are [ROCK, PAPER, SCISSORS]",
                    )
                    .await;
                }
            }
        }

        let _guard = game.lock_for_resolve().await;

        // The opponent resolved the round while we waited for the lock.
        if !self.matches.contains(id) {
            return MatchOutcome::AlreadyResolved;
        }

        let Some((my_move, their_move)) =
            game.wait_for_moves(nickname, opponent, self.move_wait).await
        else {
            self.opponent_missing(conn_id).await;
            return MatchOutcome::OpponentGone;
        };

        self.notify(conn_id, format!("> You chose to play {my_move}")).await;
        self.notify(conn_id, format!("> <{opponent}> chose to play {their_move}"))
            .await;
        self.sessions
            .send_to_nickname(opponent, format!("> You chose to play {their_move}"))
            .await;
        self.sessions
            .send_to_nickname(opponent, format!("> <{nickname}> chose to play {my_move}"))
            .await;

        let verdict = match rules::winner(nickname, my_move, opponent, their_move) {
            Some(winner) => format!("> Winner was <{winner}>!"),
            None => "> It was a tie!".to_string(),
        };
        self.notify(conn_id, verdict.clone()).await;
        self.sessions.send_to_nickname(opponent, verdict).await;

        // Removing the entry while the lock is held is what makes
        // resolution happen exactly once.
        self.matches.remove(id);
        MatchOutcome::Resolved
    }

    async fn notify(&self, conn_id: ConnectionId, message: impl Into<String>) {
        self.sessions.send_to_connection(conn_id, message).await;
    }

    async fn opponent_missing(&self, conn_id: ConnectionId) {
        self.notify(
            conn_id,
            "> Opponent seems to have gone idle/away. Returning to chat.",
        )
        .await;
    }
}
