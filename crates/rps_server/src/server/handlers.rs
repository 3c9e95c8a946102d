//! Per-connection session handling.
//!
//! Each accepted socket gets one task running [`handle_connection`]: a
//! writer task forwards this connection's share of the outgoing broadcast
//! channel to the socket, while the reader side walks the session through
//! the nickname handshake, the chat loop, and any matches the user enters.

use crate::{
    config::ServerConfig,
    game::{LineSource, MatchEngine, MatchOutcome, MatchRegistry},
    protocol::{self, Command},
    session::{ConnectionId, PresenceSet, SessionRegistry},
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

/// Line input read straight off the TCP stream.
struct TcpLineSource {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl LineSource for TcpLineSource {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Drives one client session from accept to disconnect.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    sessions: Arc<SessionRegistry>,
    presence: Arc<PresenceSet>,
    matches: Arc<MatchRegistry>,
    config: ServerConfig,
) {
    let connection_id = sessions.add_connection(addr).await;
    info!("🔗 New connection {} from {}", connection_id, addr);

    let (read_half, mut write_half) = stream.into_split();

    // Subscribe before the first send so no message addressed to this
    // connection is missed.
    let mut outgoing = sessions.subscribe();
    let writer = tokio::spawn(async move {
        loop {
            match outgoing.recv().await {
                Ok((target, line)) => {
                    if target != connection_id {
                        continue;
                    }
                    if write_half.write_all(line.as_bytes()).await.is_err()
                        || write_half.write_all(b"\n").await.is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("📤 Connection {} dropped {} queued lines", connection_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut input = TcpLineSource {
        lines: BufReader::new(read_half).lines(),
    };

    sessions
        .send_to_connection(
            connection_id,
            "Welcome to the RPS server! What is your nickname?",
        )
        .await;

    let Some(nickname) = login(connection_id, &sessions, &mut input).await else {
        sessions.remove_connection(connection_id).await;
        writer.abort();
        info!("❌ Connection {} closed before login", connection_id);
        return;
    };
    info!("👋 Connection {} logged in as '{}'", connection_id, nickname);

    let engine = MatchEngine::new(sessions.clone(), presence.clone(), matches.clone(), &config);
    chat_loop(
        connection_id,
        &nickname,
        &sessions,
        &presence,
        &engine,
        &mut input,
    )
    .await;

    // Disconnect: announce, then tear the session down.
    sessions
        .broadcast_from(
            connection_id,
            &format!("{} *{} has left*", protocol::chat_timestamp(), nickname),
        )
        .await;
    presence.clear(&nickname);
    sessions.remove_connection(connection_id).await;
    writer.abort();
    info!("👋 '{}' disconnected ({})", nickname, connection_id);
}

/// The nickname handshake. Loops until the client supplies a free, valid
/// nickname or hangs up.
async fn login<S: LineSource>(
    connection_id: ConnectionId,
    sessions: &SessionRegistry,
    input: &mut S,
) -> Option<String> {
    loop {
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => return None,
        };
        let candidate = line.trim();

        if !protocol::valid_nickname(candidate)
            || !sessions.claim_nickname(connection_id, candidate).await
        {
            sessions
                .send_to_connection(
                    connection_id,
                    format!("'{candidate}' is taken/invalid. Please pick another name"),
                )
                .await;
            continue;
        }

        let others: Vec<String> = sessions
            .roster()
            .await
            .into_iter()
            .filter(|name| name != candidate)
            .collect();
        sessions
            .send_to_connection(
                connection_id,
                format!(
                    "You are connected with {} other users: [{}]",
                    others.len(),
                    others.join(", ")
                ),
            )
            .await;
        sessions
            .send_to_connection(connection_id, "To start a game, enter 'rps start @user'")
            .await;
        sessions
            .broadcast_from(
                connection_id,
                &format!("{} *{} has joined*", protocol::chat_timestamp(), candidate),
            )
            .await;

        return Some(candidate.to_string());
    }
}

/// The main session loop: chat, challenges, and matches, until EOF.
async fn chat_loop<S: LineSource>(
    connection_id: ConnectionId,
    nickname: &str,
    sessions: &SessionRegistry,
    presence: &PresenceSet,
    engine: &MatchEngine,
    input: &mut S,
) {
    loop {
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => return,
        };
        let text = line.trim();

        match protocol::parse(text) {
            Command::Accept(opponent) => {
                // No pending-request bookkeeping: a stale accept simply
                // waits out the join budget and returns to chat.
                let outcome = engine
                    .run(connection_id, nickname, &opponent, input)
                    .await;
                if outcome == MatchOutcome::Disconnected {
                    return;
                }
            }
            Command::Challenge(opponent) => {
                if !challenge_allowed(connection_id, nickname, &opponent, sessions, presence).await
                {
                    continue;
                }
                sessions
                    .send_to_nickname(
                        &opponent,
                        format!(
                            "> <{nickname}> has sent you a game request. \
                             Type 'accept @{nickname}' to join."
                        ),
                    )
                    .await;
                let outcome = engine
                    .run(connection_id, nickname, &opponent, input)
                    .await;
                if outcome == MatchOutcome::Disconnected {
                    return;
                }
            }
            Command::ChallengeMalformed => {
                sessions
                    .send_to_connection(connection_id, "> Pick only one opponent.")
                    .await;
            }
            Command::Chat => {
                sessions
                    .broadcast_from(
                        connection_id,
                        &format!("{} <{nickname}> {text}", protocol::chat_timestamp()),
                    )
                    .await;
            }
        }
    }
}

/// Challenge preconditions: the opponent must be online, not yourself, and
/// not already in a match. Each failure gets its own notice.
async fn challenge_allowed(
    connection_id: ConnectionId,
    nickname: &str,
    opponent: &str,
    sessions: &SessionRegistry,
    presence: &PresenceSet,
) -> bool {
    if !sessions.is_online(opponent).await {
        sessions
            .send_to_connection(connection_id, format!("> <{opponent}> is not online."))
            .await;
        return false;
    }
    if opponent == nickname {
        sessions
            .send_to_connection(connection_id, "> You can't start a game against yourself.")
            .await;
        return false;
    }
    if presence.contains(opponent) {
        sessions
            .send_to_connection(connection_id, format!("> <{opponent}> is already in-game."))
            .await;
        return false;
    }
    true
}
