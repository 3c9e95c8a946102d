//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize server behavior.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the RPS server.
///
/// Contains all necessary parameters to configure server behavior including
/// network settings, connection limits, and the match engine timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Seconds a match entrant waits for the opponent to join
    pub join_wait_secs: u64,

    /// Seconds a resolving player waits for the opponent's move
    pub move_wait_secs: u64,
}

impl ServerConfig {
    /// Join-wait budget as a [`Duration`].
    pub fn join_wait(&self) -> Duration {
        Duration::from_secs(self.join_wait_secs)
    }

    /// Move-wait budget as a [`Duration`].
    pub fn move_wait(&self) -> Duration {
        Duration::from_secs(self.move_wait_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5001"
                .parse()
                .expect("Invalid default bind address"),
            max_connections: 1000,
            join_wait_secs: 10,
            move_wait_secs: 10,
        }
    }
}
