//! Server and game configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::game::{RepeatGuessPolicy, Rules};

/// Tunable rules for the shared session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct GameConfig {
    /// Wrong guesses tolerated per round, shared by all players.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Points awarded per revealed position.
    #[serde(default = "default_points")]
    points_per_letter: i64,

    /// Points deducted for a wrong guess.
    #[serde(default = "default_points")]
    wrong_guess_penalty: i64,

    /// Handling of guesses for characters already on the board.
    #[serde(default)]
    repeat_guess_policy: RepeatGuessPolicy,

    /// Seconds the active player has before the turn passes on.
    #[serde(default)]
    turn_timeout_secs: Option<u64>,

    /// Fixed seed for word draws.
    #[serde(default)]
    seed: Option<u64>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_points() -> i64 {
    100
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            points_per_letter: default_points(),
            wrong_guess_penalty: default_points(),
            repeat_guess_policy: RepeatGuessPolicy::default(),
            turn_timeout_secs: None,
            seed: None,
        }
    }
}

/// Largest score change a single rule may apply.
pub const MAX_POINTS: i64 = 1_000_000;

impl GameConfig {
    /// Checks the rules describe a playable round.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `max_attempts` is zero, when
    /// `points_per_letter` is not positive, when `wrong_guess_penalty` is
    /// negative, or when either exceeds [`MAX_POINTS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::new(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_POINTS).contains(&self.points_per_letter) {
            return Err(ConfigError::new(format!(
                "points_per_letter must be between 1 and {}, got {}",
                MAX_POINTS, self.points_per_letter
            )));
        }
        if !(0..=MAX_POINTS).contains(&self.wrong_guess_penalty) {
            return Err(ConfigError::new(format!(
                "wrong_guess_penalty must be between 0 and {}, got {}",
                MAX_POINTS, self.wrong_guess_penalty
            )));
        }
        Ok(())
    }

    /// Round rules derived from this config.
    pub fn rules(&self) -> Rules {
        Rules {
            max_attempts: self.max_attempts,
            points_per_letter: self.points_per_letter,
            wrong_guess_penalty: self.wrong_guess_penalty,
            repeat_policy: self.repeat_guess_policy,
        }
    }

    /// Turn timeout, if any. A zero timeout counts as none.
    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Network and catalog settings plus the game rules.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,

    /// Path of the JSON word catalog.
    #[serde(default = "default_words")]
    words: PathBuf,

    /// Game rules.
    #[serde(default)]
    game: GameConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_words() -> PathBuf {
    PathBuf::from("wordlist.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            words: default_words(),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text and validates the game rules.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.game.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
