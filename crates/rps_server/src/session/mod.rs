//! Session management for connected clients.
//!
//! This module handles the lifecycle of client connections: connection
//! tracking, nickname ownership, outgoing line delivery, and the in-game
//! presence set.

pub mod presence;
pub mod registry;
pub mod session;

pub use presence::PresenceSet;
pub use registry::SessionRegistry;
pub use session::Session;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server, before and after a nickname
/// is claimed.
pub type ConnectionId = usize;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// In the ordinary chat loop
    #[default]
    Idle,
    /// Inside the match engine, waiting for the opponent to join
    AwaitingOpponentJoin,
    /// Inside a running match
    InMatch,
}
