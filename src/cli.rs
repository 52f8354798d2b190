//! Command-line interface for wonder_words.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wonder_words::{ConfigError, RepeatGuessPolicy, ServerConfig};

/// Wonder Words - shared turn-based word guessing over websockets
#[derive(Parser, Debug)]
#[command(name = "wonder_words")]
#[command(about = "Multiplayer word guessing server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve(ServeArgs),

    /// Validate a word catalog and report its size
    Words {
        /// Path to the JSON word catalog
        #[arg(long, default_value = "wordlist.json")]
        words: PathBuf,
    },
}

/// Options for `serve`. Flags override the config file.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to a TOML config file (optional)
    #[arg(short, long, default_value = "wonder_words.toml")]
    pub config: PathBuf,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the JSON word catalog
    #[arg(long)]
    pub words: Option<PathBuf>,

    /// Shared wrong guesses allowed per round
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Handling of already revealed guesses (consume_turn, reject, penalize)
    #[arg(long)]
    pub repeat_policy: Option<RepeatGuessPolicy>,

    /// Seconds before an idle player's turn is skipped
    #[arg(long)]
    pub turn_timeout: Option<u64>,

    /// Seed for word draws
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ServeArgs {
    /// Applies flag overrides on top of `config` and validates the result.
    pub fn apply(&self, mut config: ServerConfig) -> Result<ServerConfig, ConfigError> {
        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(words) = &self.words {
            config = config.with_words(words.clone());
        }

        let mut game = config.game().clone();
        if let Some(attempts) = self.attempts {
            game = game.with_max_attempts(attempts);
        }
        if let Some(policy) = self.repeat_policy {
            game = game.with_repeat_guess_policy(policy);
        }
        if let Some(secs) = self.turn_timeout {
            game = game.with_turn_timeout_secs(Some(secs));
        }
        if let Some(seed) = self.seed {
            game = game.with_seed(Some(seed));
        }
        game.validate()?;
        Ok(config.with_game(game))
    }
}
