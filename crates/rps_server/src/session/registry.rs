//! Session registry: connection tracking and nickname ownership.
//!
//! This module provides the central management system for all client
//! connections: connection lifecycle, the nickname namespace (the single
//! source of truth for "who is online"), and outgoing line delivery.

use super::{ConnectionId, Session, SessionState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, trace};

/// Central manager for all client sessions.
///
/// The `SessionRegistry` tracks active connections, assigns unique IDs,
/// owns the nickname namespace, and provides line delivery to individual
/// connections as well as chat broadcast. It uses async-safe data structures
/// to handle concurrent access from every connection's task.
///
/// # Architecture
///
/// * `RwLock<HashMap>` storage for session records, short-held
/// * A separate nickname index whose write lock makes claiming a nickname a
///   single atomic step: of N concurrent claimants of one name, exactly one
///   wins
/// * Atomic connection ID generation
/// * A broadcast channel for outgoing lines; each connection's writer task
///   subscribes and filters on its own connection ID
#[derive(Debug)]
pub struct SessionRegistry {
    /// Map of connection ID to session record
    sessions: RwLock<HashMap<ConnectionId, Session>>,

    /// Index from claimed nickname to connection ID
    nicknames: RwLock<HashMap<String, ConnectionId>>,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,

    /// Broadcast sender for outgoing lines to specific connections
    sender: broadcast::Sender<(ConnectionId, String)>,
}

impl SessionRegistry {
    /// Creates a new session registry with an empty nickname namespace.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self {
            sessions: RwLock::new(HashMap::new()),
            nicknames: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            sender,
        }
    }

    /// Adds a new anonymous connection and returns its unique ID.
    pub async fn add_connection(&self, remote_addr: SocketAddr) -> ConnectionId {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.write().await;
        sessions.insert(connection_id, Session::new(remote_addr));
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        connection_id
    }

    /// Removes a connection, releasing its nickname if one was claimed.
    ///
    /// Returns the released nickname so the caller can announce the
    /// departure. Safe to call for connections that never finished the
    /// handshake.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(&connection_id)?;
        info!(
            "❌ Connection {} from {} disconnected",
            connection_id, session.remote_addr
        );
        drop(sessions);

        if let Some(nickname) = &session.nickname {
            self.nicknames.write().await.remove(nickname);
        }
        session.nickname
    }

    /// Atomically claims a nickname for a connection.
    ///
    /// The nickname index write lock is the serialization point: for any set
    /// of sessions concurrently claiming the same name, exactly one insert
    /// succeeds and the rest observe `false`.
    pub async fn claim_nickname(&self, connection_id: ConnectionId, nickname: &str) -> bool {
        let mut nicknames = self.nicknames.write().await;
        if nicknames.contains_key(nickname) {
            debug!("Nickname '{}' already taken", nickname);
            return false;
        }
        nicknames.insert(nickname.to_string(), connection_id);
        drop(nicknames);

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&connection_id) {
            session.nickname = Some(nickname.to_string());
        }
        info!("👋 Connection {} is now '{}'", connection_id, nickname);
        true
    }

    /// Finds the connection ID that owns a nickname.
    pub async fn lookup(&self, nickname: &str) -> Option<ConnectionId> {
        self.nicknames.read().await.get(nickname).copied()
    }

    /// Whether a nickname is currently online (claimed by a live connection).
    pub async fn is_online(&self, nickname: &str) -> bool {
        self.nicknames.read().await.contains_key(nickname)
    }

    /// All currently claimed nicknames, in no particular order.
    pub async fn roster(&self) -> Vec<String> {
        self.nicknames.read().await.keys().cloned().collect()
    }

    /// Number of live connections, handshaken or not.
    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of sessions past the handshake.
    pub async fn user_count(&self) -> usize {
        self.nicknames.read().await.len()
    }

    /// Updates the lifecycle state of a session.
    pub async fn set_state(&self, connection_id: ConnectionId, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&connection_id) {
            session.state = state;
        }
    }

    /// Queues a line for delivery to a specific connection.
    ///
    /// The trailing newline is added by the connection's writer task.
    pub async fn send_to_connection(&self, connection_id: ConnectionId, line: impl Into<String>) {
        if self.sender.send((connection_id, line.into())).is_err() {
            trace!("No active receivers for connection {}", connection_id);
        }
    }

    /// Queues a line for delivery to a nickname.
    ///
    /// Returns `false` when the nickname is not online; the line is dropped
    /// in that case.
    pub async fn send_to_nickname(&self, nickname: &str, line: impl Into<String>) -> bool {
        match self.lookup(nickname).await {
            Some(connection_id) => {
                self.send_to_connection(connection_id, line).await;
                true
            }
            None => false,
        }
    }

    /// Broadcasts a chat line to every handshaken session except the sender.
    ///
    /// # Returns
    ///
    /// The number of connections the line was queued for.
    pub async fn broadcast_from(&self, sender_id: ConnectionId, line: &str) -> usize {
        let nicknames = self.nicknames.read().await;
        let mut delivered = 0;
        for &connection_id in nicknames.values() {
            if connection_id == sender_id {
                continue;
            }
            if self.sender.send((connection_id, line.to_string())).is_ok() {
                delivered += 1;
            }
        }
        trace!("📡 Broadcast line to {} connections", delivered);
        delivered
    }

    /// Creates a new receiver for outgoing lines.
    ///
    /// Each connection's writer task calls this and filters the stream on
    /// its own connection ID.
    pub fn subscribe(&self) -> broadcast::Receiver<(ConnectionId, String)> {
        self.sender.subscribe()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_claim_is_exclusive() {
        let registry = Arc::new(SessionRegistry::new());
        let a = registry.add_connection(addr()).await;
        let b = registry.add_connection(addr()).await;

        let r1 = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.claim_nickname(a, "alice").await })
        };
        let r2 = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.claim_nickname(b, "alice").await })
        };
        let (r1, r2) = (r1.await.unwrap(), r2.await.unwrap());

        // Exactly one claimant wins, regardless of scheduling
        assert!(r1 ^ r2);
        assert!(registry.is_online("alice").await);
        assert_eq!(registry.user_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_releases_nickname() {
        let registry = SessionRegistry::new();
        let id = registry.add_connection(addr()).await;
        assert!(registry.claim_nickname(id, "bob").await);
        assert!(registry.is_online("bob").await);

        assert_eq!(registry.remove_connection(id).await.as_deref(), Some("bob"));
        assert!(!registry.is_online("bob").await);
        assert_eq!(registry.connection_count().await, 0);

        // The name is immediately reusable
        let id2 = registry.add_connection(addr()).await;
        assert!(registry.claim_nickname(id2, "bob").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_broadcast_skips_sender_and_anonymous() {
        let registry = SessionRegistry::new();
        let a = registry.add_connection(addr()).await;
        let b = registry.add_connection(addr()).await;
        let _anon = registry.add_connection(addr()).await;
        registry.claim_nickname(a, "alice").await;
        registry.claim_nickname(b, "bob").await;

        let mut rx = registry.subscribe();
        let delivered = registry.broadcast_from(a, "hello").await;
        assert_eq!(delivered, 1);

        let (target, line) = rx.recv().await.unwrap();
        assert_eq!(target, b);
        assert_eq!(line, "hello");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_to_offline_nickname() {
        let registry = SessionRegistry::new();
        assert!(!registry.send_to_nickname("ghost", "boo").await);
    }
}
