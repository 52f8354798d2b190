//! Authoritative record of one guessing round and the rules that change it.
//!
//! Every mutating method validates before it writes, so a refused call
//! leaves the state exactly as it was.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use super::mask::RevealedMask;
use super::types::{GameStatus, GuessOutcome, GuessReport, PlayerId, RepeatGuessPolicy, Rules};
use crate::words::WordEntry;

/// State of the shared session.
///
/// The roster is the key set of `scores`, ordered by [`PlayerId`], which is
/// also join order. `turn` is a 1-based ordinal into that ordering.
#[derive(Debug, Clone)]
pub struct GameState {
    mask: RevealedMask,
    description: String,
    turn: usize,
    scores: BTreeMap<PlayerId, i64>,
    remaining_attempts: u32,
    status: GameStatus,
    message: String,
    turns_taken: u64,
    rules: Rules,
}

impl GameState {
    /// Starts a round on `entry` with an empty roster.
    #[instrument(skip(entry), fields(word_id = *entry.id()))]
    pub fn new(entry: &WordEntry, rules: Rules) -> Self {
        info!("Creating game state");
        Self {
            mask: RevealedMask::new(entry.text()),
            description: entry.description().clone(),
            turn: 1,
            scores: BTreeMap::new(),
            remaining_attempts: rules.max_attempts,
            status: GameStatus::Active,
            message: String::new(),
            turns_taken: 0,
            rules,
        }
    }

    /// Starts a fresh round on `entry`, keeping the roster with zeroed scores.
    #[instrument(skip(self, entry), fields(word_id = *entry.id()))]
    pub fn reset(&mut self, entry: &WordEntry, started_by: PlayerId) {
        self.mask = RevealedMask::new(entry.text());
        self.description = entry.description().clone();
        self.turn = 1;
        self.scores.values_mut().for_each(|s| *s = 0);
        self.remaining_attempts = self.rules.max_attempts;
        self.status = GameStatus::Active;
        self.message = format!("New round started by {}.", started_by.display_name());
        self.turns_taken += 1;
        info!(players = self.scores.len(), "Round reset");
    }

    /// Adds a player with a zero score. Turn state is untouched.
    pub fn add_player(&mut self, player: PlayerId) {
        self.scores.entry(player).or_insert(0);
        debug!(%player, players = self.scores.len(), "Player added");
    }

    /// Removes a player and keeps the turn ordinal pointing at a connected
    /// player. Returns `false` for unknown players.
    ///
    /// If someone ahead of the active player leaves, the ordinal shifts down
    /// so the same player stays active. If the active player leaves, the
    /// next player in join order inherits the turn.
    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        let Some(ordinal) = self.ordinal_of(player) else {
            return false;
        };
        self.scores.remove(&player);

        let count = self.scores.len();
        if count == 0 {
            self.turn = 1;
        } else if ordinal < self.turn {
            self.turn -= 1;
        } else if self.turn > count {
            self.turn = 1;
        }
        debug!(%player, players = count, turn = self.turn, "Player removed");
        true
    }

    /// Applies a guess from `player`.
    ///
    /// Returns `None` without touching anything when the player is unknown
    /// or not active, the round is over, or `input` holds no guessable
    /// character.
    #[instrument(skip(self), fields(status = %self.status, turn = self.turn))]
    pub fn apply_guess(&mut self, player: PlayerId, input: &str) -> Option<GuessReport> {
        if self.status == GameStatus::Over {
            debug!("Round is over, guess ignored");
            return None;
        }
        if self.active_player() != Some(player) {
            debug!(active = ?self.active_player(), "Not this player's turn");
            return None;
        }
        let Some(character) = normalize(input) else {
            debug!("Guess holds no usable character");
            return None;
        };

        let outcome = if self.mask.is_revealed(character) {
            match self.rules.repeat_policy {
                RepeatGuessPolicy::Reject => GuessOutcome::Rejected,
                RepeatGuessPolicy::ConsumeTurn => GuessOutcome::Repeat,
                RepeatGuessPolicy::Penalize => self.miss(),
            }
        } else {
            match self.mask.reveal(character) {
                0 => self.miss(),
                revealed => GuessOutcome::Correct { revealed },
            }
        };

        let name = player.display_name();
        let shown: String = character.to_uppercase().collect();
        let score = self.scores.entry(player).or_insert(0);

        match outcome {
            GuessOutcome::Rejected => {
                debug!(character = %shown, "Repeat guess refused");
            }
            GuessOutcome::Repeat => {
                self.message = format!("{name} guessed {shown} again. It is already revealed.");
                self.advance_turn();
            }
            GuessOutcome::Correct { revealed } => {
                let gained = self
                    .rules
                    .points_per_letter
                    .saturating_mul(i64::try_from(revealed).unwrap_or(i64::MAX));
                *score = score.saturating_add(gained);
                self.message = format!(
                    "Right guess! {name} revealed {revealed} x {shown} and has a total of {} points.",
                    *score
                );
                self.advance_turn();
                if self.mask.is_complete() {
                    self.finish();
                }
            }
            GuessOutcome::Wrong { remaining_attempts } => {
                *score = score.saturating_sub(self.rules.wrong_guess_penalty);
                self.message = format!(
                    "Wrong guess! {name} has a total of {} points. {remaining_attempts} moves remaining.",
                    *score
                );
                self.advance_turn();
                if remaining_attempts == 0 {
                    self.finish();
                }
            }
        }

        let report = GuessReport {
            player,
            character,
            outcome,
            score: self.score_of(player).unwrap_or_default(),
            status: self.status,
        };
        info!(%player, outcome = ?report.outcome, score = report.score, "Guess applied");
        Some(report)
    }

    /// Passes the turn on from the active player without scoring.
    /// Returns the skipped player.
    pub fn skip_turn(&mut self) -> Option<PlayerId> {
        if self.status == GameStatus::Over {
            return None;
        }
        let skipped = self.active_player()?;
        self.message = format!("{} ran out of time.", skipped.display_name());
        self.advance_turn();
        info!(%skipped, "Turn skipped");
        Some(skipped)
    }

    /// Player at the turn ordinal, if anyone is connected.
    pub fn active_player(&self) -> Option<PlayerId> {
        self.scores.keys().nth(self.turn.checked_sub(1)?).copied()
    }

    /// Connected players in join order.
    pub fn players(&self) -> Vec<PlayerId> {
        self.scores.keys().copied().collect()
    }

    /// Whether `player` is connected.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.scores.contains_key(&player)
    }

    /// Score of `player`.
    pub fn score_of(&self, player: PlayerId) -> Option<i64> {
        self.scores.get(&player).copied()
    }

    /// All scores keyed by player.
    pub fn scores(&self) -> &BTreeMap<PlayerId, i64> {
        &self.scores
    }

    /// Mask as shown to players.
    pub fn revealed_word(&self) -> String {
        self.mask.render()
    }

    /// The secret. Never sent to clients.
    pub fn secret_word(&self) -> String {
        self.mask.secret()
    }

    /// Underlying reveal mask.
    pub fn mask(&self) -> &RevealedMask {
        &self.mask
    }

    /// Hint for the current word.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 1-based turn ordinal.
    pub fn turn(&self) -> usize {
        self.turn
    }

    /// Wrong guesses left in this round.
    pub fn remaining_attempts(&self) -> u32 {
        self.remaining_attempts
    }

    /// Round status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Result of the most recent action.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Counter bumped on every turn change.
    pub fn turns_taken(&self) -> u64 {
        self.turns_taken
    }

    /// Rules this round is played under.
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    fn ordinal_of(&self, player: PlayerId) -> Option<usize> {
        self.scores.keys().position(|p| *p == player).map(|i| i + 1)
    }

    fn miss(&mut self) -> GuessOutcome {
        self.remaining_attempts = self.remaining_attempts.saturating_sub(1);
        GuessOutcome::Wrong {
            remaining_attempts: self.remaining_attempts,
        }
    }

    fn advance_turn(&mut self) {
        self.turn += 1;
        if self.turn > self.scores.len() {
            self.turn = 1;
        }
        self.turns_taken += 1;
    }

    fn finish(&mut self) {
        self.status = GameStatus::Over;
        self.message
            .push_str(&format!(" Game over! The word was {}.", self.mask.secret()));
        info!(word = %self.mask.secret(), "Round over");
    }
}

/// Trims `input` and takes its first character. Whitespace is never a guess.
fn normalize(input: &str) -> Option<char> {
    input.trim().chars().next()
}
