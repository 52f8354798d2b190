//! Core domain types for the guessing game.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Connection-scoped player identifier.
///
/// Handed out from a counter that only moves forward, so an identifier
/// keeps its meaning for the whole life of the process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    /// Wraps a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Name shown to other players.
    pub fn display_name(self) -> String {
        format!("Player {}", self.0)
    }
}

/// Whether the round still accepts guesses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Guesses are accepted.
    #[default]
    Active,
    /// The word was solved or the attempts ran out.
    Over,
}

/// What happens when a player guesses a character that is already revealed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepeatGuessPolicy {
    /// No reveal and no penalty, but the turn passes on.
    #[default]
    ConsumeTurn,
    /// The guess is refused and the same player keeps the turn.
    Reject,
    /// Scored exactly like a wrong guess.
    Penalize,
}

/// Scoring and turn rules for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Shared pool of wrong guesses tolerated per round.
    pub max_attempts: u32,
    /// Points awarded per revealed position.
    pub points_per_letter: i64,
    /// Points removed for a wrong guess.
    pub wrong_guess_penalty: i64,
    /// Handling of already revealed characters.
    pub repeat_policy: RepeatGuessPolicy,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            points_per_letter: 100,
            wrong_guess_penalty: 100,
            repeat_policy: RepeatGuessPolicy::default(),
        }
    }
}

/// Effect of an accepted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The character revealed `revealed` new positions.
    Correct {
        /// Number of positions revealed.
        revealed: usize,
    },
    /// The character is not in the word.
    Wrong {
        /// Attempts left after this guess.
        remaining_attempts: u32,
    },
    /// The character was already revealed and the turn was consumed.
    Repeat,
    /// The character was already revealed and the guess was refused.
    Rejected,
}

/// Result handed back to the guessing player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessReport {
    /// Who guessed.
    pub player: PlayerId,
    /// First non-blank character of the input, as typed.
    pub character: char,
    /// What the guess did.
    pub outcome: GuessOutcome,
    /// The guesser's score afterwards.
    pub score: i64,
    /// Status of the round afterwards.
    pub status: GameStatus,
}

impl GuessReport {
    /// Whether this guess ended the round.
    pub fn ended_round(&self) -> bool {
        self.status == GameStatus::Over
            && !matches!(self.outcome, GuessOutcome::Rejected)
    }
}
