//! Error types and handling for the RPS server.
//!
//! This module defines the error types that can occur during server
//! operations. None of these are fatal to the server process: every failure
//! is scoped to a single session or a single match.

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as registry or channel failures
    #[error("Internal error: {0}")]
    Internal(String),
}
