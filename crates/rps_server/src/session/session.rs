//! Client session representation.
//!
//! This module defines the per-connection record tracked by the
//! [`SessionRegistry`](super::SessionRegistry): identity, network metadata,
//! and lifecycle state.

use super::SessionState;
use std::net::SocketAddr;
use std::time::SystemTime;

/// Represents an individual client connection to the server.
///
/// A session starts anonymous; the `nickname` is filled in once the
/// handshake completes and the name has been claimed in the registry.
///
/// # Fields
///
/// * `nickname` - The unique nickname, `None` until the handshake completes
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was established
/// * `state` - Current lifecycle state of the session
#[derive(Debug)]
pub struct Session {
    /// The nickname claimed by this connection (None until handshake)
    pub nickname: Option<String>,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    /// Current lifecycle state of this session
    pub state: SessionState,
}

impl Session {
    /// Creates a new anonymous session with the specified remote address.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            nickname: None,
            remote_addr,
            connected_at: SystemTime::now(),
            state: SessionState::Idle,
        }
    }
}
