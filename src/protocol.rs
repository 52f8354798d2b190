//! JSON messages exchanged with websocket clients.

use std::collections::BTreeMap;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::game::{GameState, GameStatus, PlayerId};

/// What an inbound frame asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientAction {
    /// Guess a character.
    #[default]
    Guess,
    /// Start a new round once the current one is over.
    NewRound,
}

/// Raw inbound frame.
///
/// `action` defaults to a guess so that `{"character": "e"}` works as is.
/// Unknown fields such as a client-side `playerID` are ignored; the sender
/// is always the connection's own player.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    action: ClientAction,
    #[serde(default)]
    character: Option<String>,
}

/// Decoded inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Guess the given input.
    Guess(String),
    /// Ask for a new round.
    NewRound,
}

impl ClientMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the frame is not valid JSON for this
    /// shape or a guess carries no `character`.
    #[instrument(skip(text), fields(len = text.len()))]
    pub fn decode(text: &str) -> Result<ClientCommand, ProtocolError> {
        let message: Self = serde_json::from_str(text)
            .map_err(|e| ProtocolError::new(format!("Invalid message: {}", e)))?;

        match message.action {
            ClientAction::Guess => message
                .character
                .map(ClientCommand::Guess)
                .ok_or_else(|| ProtocolError::new("Guess without character")),
            ClientAction::NewRound => Ok(ClientCommand::NewRound),
        }
    }
}

/// Malformed inbound frame.
#[derive(Debug, Clone, Display, Error)]
#[display("Protocol error: {} at {}:{}", message, file, line)]
pub struct ProtocolError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProtocolError {
    /// Creates a new protocol error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Read-only view of the session sent to clients.
///
/// The secret word is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// 1-based turn ordinal.
    pub turn: usize,
    /// Mask with unguessed positions hidden.
    pub revealed_word: String,
    /// Hint text.
    pub description: String,
    /// Scores by player.
    pub scores: BTreeMap<PlayerId, i64>,
    /// Display names by player.
    pub players: BTreeMap<PlayerId, String>,
    /// Player whose turn it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_player: Option<PlayerId>,
    /// Result of the last action.
    pub message: String,
    /// Round status.
    pub status: GameStatus,
    /// Wrong guesses left.
    pub remaining_attempts: u32,
    /// The receiving player, when the view was made for one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub you: Option<PlayerId>,
}

impl Snapshot {
    /// Projects `state` for `viewer`.
    pub fn of(state: &GameState, viewer: Option<PlayerId>) -> Self {
        Self {
            turn: state.turn(),
            revealed_word: state.revealed_word(),
            description: state.description().to_string(),
            scores: state.scores().clone(),
            players: state
                .scores()
                .keys()
                .map(|id| (*id, id.display_name()))
                .collect(),
            active_player: state.active_player(),
            message: state.message().to_string(),
            status: state.status(),
            remaining_attempts: state.remaining_attempts(),
            you: viewer.filter(|id| state.contains(*id)),
        }
    }
}

/// Roster and lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notice {
    /// Someone connected.
    PlayerJoined {
        /// The new player.
        #[serde(rename = "playerID")]
        player_id: PlayerId,
        /// Everyone connected, including the new player.
        #[serde(rename = "playerIDs")]
        player_ids: Vec<PlayerId>,
    },
    /// Someone disconnected.
    PlayerLeft {
        /// The departed player.
        #[serde(rename = "playerID")]
        player_id: PlayerId,
        /// Everyone still connected.
        #[serde(rename = "playerIDs")]
        player_ids: Vec<PlayerId>,
    },
    /// The round ended.
    GameOver,
}

/// Any outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    /// Full state view.
    State(Snapshot),
    /// Tagged notification.
    Notice(Notice),
}

impl ServerEvent {
    /// Serializes to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Snapshot> for ServerEvent {
    fn from(snapshot: Snapshot) -> Self {
        Self::State(snapshot)
    }
}

impl From<Notice> for ServerEvent {
    fn from(notice: Notice) -> Self {
        Self::Notice(notice)
    }
}
