//! Wonder Words library - a shared, turn-based word guessing session
//!
//! One secret word, many connected players. Players take turns guessing
//! characters; correct guesses reveal positions and score points, wrong
//! guesses drain a shared pool of attempts.
//!
//! # Architecture
//!
//! - **Words**: immutable catalog the secret words are drawn from
//! - **Game**: round state and the guessing rules
//! - **Engine**: single-writer actor that owns the state and fans out events
//! - **Registry**: outbound channel per connected player
//! - **Server**: axum websocket transport
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wonder_words::{GameConfig, SessionEngine, WordBank, WordEntry};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let bank = Arc::new(WordBank::from_entries(vec![WordEntry::new(
//!     1,
//!     "SEA TOWER".to_string(),
//!     "A lighthouse".to_string(),
//! )]));
//! let session = SessionEngine::spawn(bank, GameConfig::default())?;
//!
//! let (player, _events) = session.join().await?;
//! let report = session.guess(player, "e").await?;
//! assert!(report.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod engine;
mod game;
mod protocol;
mod registry;
mod server;
mod words;

// Crate-level exports - Configuration
pub use config::{ConfigError, GameConfig, MAX_POINTS, ServerConfig};

// Crate-level exports - Engine
pub use engine::{EngineError, SessionEngine, SessionHandle};

// Crate-level exports - Game types
pub use game::{
    GameState, GameStatus, GuessOutcome, GuessReport, PLACEHOLDER, PlayerId, RepeatGuessPolicy,
    RevealedMask, Rules, same_letter,
};

// Crate-level exports - Wire protocol
pub use protocol::{ClientAction, ClientCommand, ClientMessage, Notice, ProtocolError, ServerEvent, Snapshot};

// Crate-level exports - Connections and transport
pub use registry::{ConnectionRegistry, EventReceiver, EventSender, OUTBOUND_QUEUE};
pub use server::{router, serve};

// Crate-level exports - Word catalog
pub use words::{WordBank, WordBankError, WordBankErrorKind, WordEntry};
