//! Rock-Paper-Scissors match handling: rules, live match state, and the
//! per-player engine loop that runs a match over a connection.

pub mod engine;
pub mod registry;
pub mod rules;

pub use engine::{LineSource, MatchEngine, MatchOutcome};
pub use registry::{LiveMatch, MatchRegistry};
pub use rules::Move;

use std::fmt;

/// Canonical identifier for a match between two players.
///
/// Both players derive the same id regardless of who challenged whom: the
/// two nicknames are sorted and joined, so `alice` vs `bob` is always
/// `alice-bob`. Nicknames are ASCII alphanumeric, so the separator cannot
/// collide with name content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            MatchId(format!("{a}-{b}"))
        } else {
            MatchId(format!("{b}-{a}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
