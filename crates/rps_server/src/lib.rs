//! # RPS Server - Chat and Match Infrastructure
//!
//! A line-oriented TCP server where many concurrently connected users chat
//! and challenge each other to real-time Rock-Paper-Scissors matches.
//!
//! ## Architecture Overview
//!
//! * **Session Registry** - Tracks connections, owns the nickname namespace,
//!   and delivers outgoing lines through a broadcast channel
//! * **Presence Set** - The set of nicknames currently inside a match; doubles
//!   as the "opponent has joined" readiness signal and the liveness signal
//! * **Protocol** - Parses `rps start @user` and `accept @user` out of an
//!   otherwise free-form chat stream
//! * **Match Registry** - Maps the deterministic match id of a player pair to
//!   the live match state, at most one entry per unordered pair
//! * **Match Engine** - Per-match state machine: join wait, move collection,
//!   and exactly-once resolution under a per-match lock
//!
//! ## Connection Flow
//!
//! 1. Client connects and is prompted for a nickname (1-20 alphanumerics,
//!    unique while connected)
//! 2. Each line the client sends is either a matchmaking command or chat
//!    broadcast to every other connected user
//! 3. A challenge sends the opponent an advisory invitation and takes the
//!    challenger into the match engine; the opponent joins by accepting
//! 4. Both sides submit one move each; whichever side finalizes first deletes
//!    the match entry inside the per-match lock, announcing the result to
//!    both players exactly once
//!
//! ## Concurrency Model
//!
//! One spawned task per connection; tasks communicate only through the shared
//! registries. Nickname and presence mutations are single atomic steps, match
//! resolution serializes per match id only, and every wait in the engine is
//! timeout-bounded. No failure here is fatal to the server process: errors
//! are scoped to a session or a match.

// Re-export core types and functions for easy access
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::RpsServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod error;
pub mod game;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod utils;

// End-to-end tests over a real TCP listener
mod tests;
