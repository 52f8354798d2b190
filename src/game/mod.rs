//! Word guessing rules and round state.

mod mask;
mod state;
mod types;

pub use mask::{PLACEHOLDER, RevealedMask, same_letter};
pub use state::GameState;
pub use types::{GameStatus, GuessOutcome, GuessReport, PlayerId, RepeatGuessPolicy, Rules};
