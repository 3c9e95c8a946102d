//! Core chat-and-matchmaking server implementation.
//!
//! This module contains the main `RpsServer` struct: it owns the shared
//! registries, binds the TCP listener, and runs the accept loop until
//! shutdown is requested. All per-session behavior lives in
//! [`handlers`](super::handlers); all match behavior lives in the game
//! engine. The core contains no protocol logic of its own.

use crate::{
    config::ServerConfig,
    error::ServerError,
    game::MatchRegistry,
    server::handlers::handle_connection,
    session::{PresenceSet, SessionRegistry},
};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The core server structure.
///
/// `RpsServer` orchestrates the session registry, the in-match presence
/// set, and the match registry, and drives the accept loop. Each accepted
/// connection runs on its own task; the registries are the only state the
/// tasks share.
pub struct RpsServer {
    /// Server configuration settings
    config: ServerConfig,

    /// All live connections and their nickname bindings
    sessions: Arc<SessionRegistry>,

    /// Nicknames currently inside a match
    presence: Arc<PresenceSet>,

    /// Matches currently in flight
    matches: Arc<MatchRegistry>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl RpsServer {
    /// Creates a new server with the specified configuration.
    ///
    /// All registries start empty. The server is ready to start after
    /// construction.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            presence: Arc::new(PresenceSet::new()),
            matches: Arc::new(MatchRegistry::new()),
            shutdown_sender,
        }
    }

    /// Binds the configured address and runs the accept loop until
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting RPS server on {}", self.config.bind_address);
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_address, e
                ))
            })?;
        self.start_with_listener(listener).await
    }

    /// Runs the accept loop on an already-bound listener.
    ///
    /// Split out from [`start`](Self::start) so tests can bind an
    /// ephemeral port themselves.
    pub async fn start_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("👂 Listening on {}", local_addr);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (mut stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("⚠️ Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    if self.sessions.connection_count().await >= self.config.max_connections {
                        warn!("🚫 Rejecting {}: server is full", addr);
                        tokio::spawn(async move {
                            let _ = stream.write_all(b"Sorry, the server is full.\n").await;
                        });
                        continue;
                    }

                    let sessions = self.sessions.clone();
                    let presence = self.presence.clone();
                    let matches = self.matches.clone();
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, sessions, presence, matches, config).await;
                    });
                }
                _ = shutdown_receiver.recv() => {
                    info!("🛑 Accept loop stopping");
                    break;
                }
            }
        }

        info!("✅ Server stopped");
        Ok(())
    }

    /// Signals the accept loop to stop. Existing sessions finish on their
    /// own tasks.
    pub fn shutdown(&self) {
        info!("🛑 Shutdown requested");
        let _ = self.shutdown_sender.send(());
    }

    /// The session registry shared with all connection tasks.
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }

    /// The in-match presence set.
    pub fn presence(&self) -> Arc<PresenceSet> {
        self.presence.clone()
    }

    /// The registry of matches in flight.
    pub fn matches(&self) -> Arc<MatchRegistry> {
        self.matches.clone()
    }

    /// The active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
