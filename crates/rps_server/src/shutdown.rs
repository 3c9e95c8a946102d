//! Shutdown coordination for graceful server shutdown.
//!
//! This module provides shared shutdown state for coordinating graceful
//! shutdown across the accept loop and any in-flight sessions, ensuring
//! final cleanup only runs once the server has actually stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Flag indicating shutdown has been initiated - no new connections accepted
    shutdown_initiated: Arc<AtomicBool>,
    /// Flag indicating the server has stopped and final cleanup can begin
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags set to false.
    pub fn new() -> Self {
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if shutdown has been initiated - no new connections should be accepted.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true if shutdown is complete and final cleanup can begin.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Initiates shutdown - sets the flag to stop accepting new connections.
    pub fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::Release);
        info!("🛑 Shutdown initiated - no new connections will be accepted");
    }

    /// Marks shutdown as complete - the server has stopped.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Server stopped - ready for final cleanup");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag_transitions() {
        let state = ShutdownState::new();
        assert!(!state.is_shutdown_initiated());
        assert!(!state.is_shutdown_complete());

        state.initiate_shutdown();
        assert!(state.is_shutdown_initiated());
        assert!(!state.is_shutdown_complete());

        state.complete_shutdown();
        assert!(state.is_shutdown_complete());
    }

    #[test]
    fn test_clones_share_state() {
        let state = ShutdownState::new();
        let observer = state.clone();
        state.initiate_shutdown();
        assert!(observer.is_shutdown_initiated());
    }
}
