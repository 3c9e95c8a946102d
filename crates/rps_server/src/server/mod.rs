//! Core server implementation and connection handling.
//!
//! This module contains the main server structure, the TCP accept loop,
//! and the per-connection session handler.

pub mod core;
pub mod handlers;

pub use core::RpsServer;
