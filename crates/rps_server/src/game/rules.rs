//! The game rules: the three moves and who beats whom.

use std::fmt;
use std::str::FromStr;

/// A Rock-Paper-Scissors move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// The move this one defeats.
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Paper => Move::Rock,
            Move::Scissors => Move::Paper,
        }
    }
}

impl FromStr for Move {
    type Err = ();

    /// Case-insensitive, so `rock`, `Rock` and `ROCK` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROCK" => Ok(Move::Rock),
            "PAPER" => Ok(Move::Paper),
            "SCISSORS" => Ok(Move::Scissors),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Rock => "ROCK",
            Move::Paper => "PAPER",
            Move::Scissors => "SCISSORS",
        };
        write!(f, "{s}")
    }
}

/// Decides a round. Returns the winning player's name, or `None` on a tie.
pub fn winner<'a>(a: &'a str, a_move: Move, b: &'a str, b_move: Move) -> Option<&'a str> {
    if a_move == b_move {
        None
    } else if a_move.beats() == b_move {
        Some(a)
    } else {
        Some(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_table() {
        assert_eq!(winner("a", Move::Rock, "b", Move::Scissors), Some("a"));
        assert_eq!(winner("a", Move::Paper, "b", Move::Rock), Some("a"));
        assert_eq!(winner("a", Move::Scissors, "b", Move::Paper), Some("a"));
        assert_eq!(winner("a", Move::Scissors, "b", Move::Rock), Some("b"));
        assert_eq!(winner("a", Move::Rock, "b", Move::Paper), Some("b"));
        assert_eq!(winner("a", Move::Paper, "b", Move::Scissors), Some("b"));
    }

    #[test]
    fn test_ties() {
        for m in [Move::Rock, Move::Paper, Move::Scissors] {
            assert_eq!(winner("a", m, "b", m), None);
        }
    }

    #[test]
    fn test_winner_is_symmetric() {
        assert_eq!(
            winner("a", Move::Rock, "b", Move::Paper),
            winner("b", Move::Paper, "a", Move::Rock)
        );
    }

    #[test]
    fn test_move_parsing() {
        assert_eq!("rock".parse(), Ok(Move::Rock));
        assert_eq!("Paper".parse(), Ok(Move::Paper));
        assert_eq!("  SCISSORS ".parse(), Ok(Move::Scissors));
        assert!("lizard".parse::<Move>().is_err());
        assert!("".parse::<Move>().is_err());
    }

    #[test]
    fn test_move_display() {
        assert_eq!(Move::Rock.to_string(), "ROCK");
        assert_eq!(Move::Paper.to_string(), "PAPER");
        assert_eq!(Move::Scissors.to_string(), "SCISSORS");
    }
}
