//! Matchmaking command parsing.
//!
//! Two commands are recognized inside an otherwise free-form chat stream:
//! `rps start @user` and `accept @user`. Both are matched by pattern anywhere
//! in the line (keywords case-sensitive) rather than by an exact command
//! grammar; everything that does not parse as a command is chat. This module
//! is pure string handling with no I/O, so every rule is unit-testable.

use chrono::Local;

/// Maximum nickname length, in characters.
pub const NICKNAME_MAX_LEN: usize = 20;

/// What a single input line means to the matchmaking protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Well-formed `accept @user`: enter the match against `user`
    Accept(String),
    /// Well-formed `rps start @user`: challenge `user`
    Challenge(String),
    /// A `rps start` line without exactly one target; rejected with a notice
    ChallengeMalformed,
    /// Ordinary chat, broadcast to all other users
    Chat,
}

/// Classifies an input line.
///
/// The accept pattern is checked first. An `accept` with zero or several
/// distinct targets falls through to the challenge check, and from there to
/// chat; a malformed `rps start` is surfaced to the sender instead.
pub fn parse(line: &str) -> Command {
    let mut targets = mentions(line);

    if line.contains("accept @") && targets.len() == 1 {
        return Command::Accept(targets.remove(0));
    }

    if line.contains("rps start @") {
        if targets.len() == 1 {
            return Command::Challenge(targets.remove(0));
        }
        return Command::ChallengeMalformed;
    }

    Command::Chat
}

/// Extracts the distinct `@name` tokens from a line.
///
/// A name is a run of 1 to [`NICKNAME_MAX_LEN`] ASCII alphanumerics directly
/// after an `@`; longer runs are cut at the limit. Duplicates count once, so
/// `rps start @bob @bob` still targets exactly one opponent.
pub fn mentions(line: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (at, _) in line.match_indices('@') {
        let name: String = line[at + 1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .take(NICKNAME_MAX_LEN)
            .collect();
        if !name.is_empty() && !names.iter().any(|n| *n == name) {
            names.push(name);
        }
    }
    names
}

/// Whether a string is an acceptable nickname: 1 to 20 ASCII alphanumerics.
pub fn valid_nickname(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= NICKNAME_MAX_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// The `[HH:MM:SS]` prefix stamped onto chat lines and announcements.
pub fn chat_timestamp() -> String {
    Local::now().format("[%H:%M:%S]").to_string()
}
