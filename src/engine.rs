//! Single-writer session engine.
//!
//! [`SessionEngine`] owns the [`GameState`] and the [`ConnectionRegistry`]
//! and runs as one tokio task that drains a command queue. Commands are
//! applied one at a time in arrival order. Connection tasks only ever talk to
//! it through a cloneable [`SessionHandle`].

use std::sync::Arc;

use derive_more::{Display, Error};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GameConfig;
use crate::game::{GameState, GameStatus, GuessOutcome, GuessReport, PlayerId};
use crate::protocol::{Notice, Snapshot};
use crate::registry::{ConnectionRegistry, EventReceiver};
use crate::words::{WordBank, WordBankError};

const COMMAND_QUEUE: usize = 256;

/// The engine task is no longer running.
#[derive(Debug, Clone, Display, Error)]
#[display("Engine error: {} at {}:{}", message, file, line)]
pub struct EngineError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl EngineError {
    /// Creates a new engine error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    #[track_caller]
    fn closed() -> Self {
        Self::new("Session engine is not running")
    }
}

enum Command {
    Join {
        reply: oneshot::Sender<(PlayerId, EventReceiver)>,
    },
    Leave {
        player: PlayerId,
    },
    Guess {
        player: PlayerId,
        input: String,
        reply: oneshot::Sender<Option<GuessReport>>,
    },
    Snapshot {
        viewer: Option<PlayerId>,
        reply: oneshot::Sender<Snapshot>,
    },
    NewRound {
        player: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

enum Wake {
    Command(Option<Command>),
    TurnExpired,
}

/// Cloneable front door to a running [`SessionEngine`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Adds a player and returns its identifier and event stream.
    ///
    /// Everyone, including the new player, receives a `playerJoined` notice.
    /// The new player then gets a snapshot addressed to it.
    #[instrument(skip(self))]
    pub async fn join(&self) -> Result<(PlayerId, EventReceiver), EngineError> {
        self.request(|reply| Command::Join { reply }).await
    }

    /// Removes a player. Unknown players are ignored.
    #[instrument(skip(self))]
    pub async fn leave(&self, player: PlayerId) -> Result<(), EngineError> {
        self.commands
            .send(Command::Leave { player })
            .await
            .map_err(|_| EngineError::closed())
    }

    /// Submits a guess. `Ok(None)` means it was silently ignored.
    #[instrument(skip(self, input))]
    pub async fn guess(
        &self,
        player: PlayerId,
        input: impl Into<String>,
    ) -> Result<Option<GuessReport>, EngineError> {
        let input = input.into();
        self.request(|reply| Command::Guess {
            player,
            input,
            reply,
        })
        .await
    }

    /// Read-only view of the session, addressed to `viewer` when given.
    pub async fn snapshot(&self, viewer: Option<PlayerId>) -> Result<Snapshot, EngineError> {
        self.request(|reply| Command::Snapshot { viewer, reply })
            .await
    }

    /// Starts a new round if the current one is over. Returns whether a new
    /// round started.
    #[instrument(skip(self))]
    pub async fn new_round(&self, player: PlayerId) -> Result<bool, EngineError> {
        self.request(|reply| Command::NewRound { player, reply })
            .await
    }

    /// Stops the engine after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| EngineError::closed())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::closed())?;
        response.await.map_err(|_| EngineError::closed())
    }
}

/// Owner of the session state.
pub struct SessionEngine {
    state: GameState,
    registry: ConnectionRegistry,
    bank: Arc<WordBank>,
    config: GameConfig,
    rng: StdRng,
    next_id: u64,
    commands: mpsc::Receiver<Command>,
}

impl SessionEngine {
    /// Draws the first word and builds an engine plus its handle.
    ///
    /// # Errors
    ///
    /// Fails if the bank is empty.
    #[instrument(skip(bank, config), fields(words = bank.len()))]
    pub fn new(
        bank: Arc<WordBank>,
        config: GameConfig,
    ) -> Result<(Self, SessionHandle), WordBankError> {
        let mut rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(*seed),
            None => StdRng::from_entropy(),
        };
        let state = GameState::new(bank.pick_random(&mut rng)?, config.rules());
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);

        info!(
            attempts = state.remaining_attempts(),
            timeout = ?config.turn_timeout(),
            "Session engine created"
        );

        let engine = Self {
            state,
            registry: ConnectionRegistry::new(),
            bank,
            config,
            rng,
            next_id: 0,
            commands: rx,
        };
        Ok((engine, SessionHandle { commands: tx }))
    }

    /// Builds an engine and runs it on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the bank is empty.
    pub fn spawn(bank: Arc<WordBank>, config: GameConfig) -> Result<SessionHandle, WordBankError> {
        let (engine, handle) = Self::new(bank, config)?;
        tokio::spawn(engine.run());
        Ok(handle)
    }

    /// Processes commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Session engine running");
        let mut turn_key = self.turn_key();
        let mut deadline = self.turn_deadline();

        loop {
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                () = turn_timer(deadline) => Wake::TurnExpired,
            };

            let expired = matches!(wake, Wake::TurnExpired);
            match wake {
                Wake::Command(Some(Command::Shutdown)) | Wake::Command(None) => break,
                Wake::Command(Some(command)) => self.handle(command),
                Wake::TurnExpired => self.expire_turn(),
            }

            let key = self.turn_key();
            if expired || key != turn_key {
                turn_key = key;
                deadline = self.turn_deadline();
            }
        }

        info!(players = self.registry.len(), "Session engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Join { reply } => {
                let (player, events) = self.join();
                if reply.send((player, events)).is_err() {
                    warn!(%player, "Joiner went away before its reply");
                    self.leave(player);
                }
            }
            Command::Leave { player } => self.leave(player),
            Command::Guess {
                player,
                input,
                reply,
            } => {
                let report = self.guess(player, &input);
                let _ = reply.send(report);
            }
            Command::Snapshot { viewer, reply } => {
                let _ = reply.send(Snapshot::of(&self.state, viewer));
            }
            Command::NewRound { player, reply } => {
                let started = self.new_round(player);
                let _ = reply.send(started);
            }
            Command::Shutdown => {}
        }
    }

    #[instrument(skip(self))]
    fn join(&mut self) -> (PlayerId, EventReceiver) {
        self.next_id += 1;
        let player = PlayerId::new(self.next_id);
        self.state.add_player(player);
        let events = self.registry.register(player);
        info!(%player, players = self.registry.len(), "Player joined");

        let joined = Notice::PlayerJoined {
            player_id: player,
            player_ids: self.state.players(),
        };
        let mut failed = self.registry.broadcast(&joined.into());
        self.registry
            .send_to(player, Snapshot::of(&self.state, Some(player)).into());
        failed.extend(
            self.registry
                .broadcast_except(player, &Snapshot::of(&self.state, None).into()),
        );
        self.drop_failed(failed);

        (player, events)
    }

    #[instrument(skip(self))]
    fn leave(&mut self, player: PlayerId) {
        let mut pending = vec![player];
        while let Some(player) = pending.pop() {
            self.registry.unregister(player);
            if !self.state.remove_player(player) {
                debug!(%player, "Leave for unknown player ignored");
                continue;
            }
            info!(%player, players = self.registry.len(), "Player left");

            let left = Notice::PlayerLeft {
                player_id: player,
                player_ids: self.state.players(),
            };
            pending.extend(self.registry.broadcast(&left.into()));
            pending.extend(
                self.registry
                    .broadcast(&Snapshot::of(&self.state, None).into()),
            );
        }
    }

    fn guess(&mut self, player: PlayerId, input: &str) -> Option<GuessReport> {
        if !self.state.contains(player) {
            warn!(%player, "Guess from unknown player ignored");
            return None;
        }
        let report = self.state.apply_guess(player, input)?;
        if report.outcome == GuessOutcome::Rejected {
            return Some(report);
        }

        let mut failed = Vec::new();
        if report.ended_round() {
            failed.extend(self.registry.broadcast(&Notice::GameOver.into()));
        }
        failed.extend(
            self.registry
                .broadcast(&Snapshot::of(&self.state, None).into()),
        );
        self.drop_failed(failed);
        Some(report)
    }

    #[instrument(skip(self))]
    fn new_round(&mut self, player: PlayerId) -> bool {
        if !self.state.contains(player) {
            debug!(%player, "New round from unknown player ignored");
            return false;
        }
        if self.state.status() != GameStatus::Over {
            debug!(%player, "Round still active, new round ignored");
            return false;
        }

        let entry = match self.bank.pick_random(&mut self.rng) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                error!(error = %e, "Could not draw a word for the new round");
                return false;
            }
        };
        self.state.reset(&entry, player);

        let failed = self
            .registry
            .broadcast(&Snapshot::of(&self.state, None).into());
        self.drop_failed(failed);
        true
    }

    fn expire_turn(&mut self) {
        if self.state.skip_turn().is_none() {
            return;
        }
        let failed = self
            .registry
            .broadcast(&Snapshot::of(&self.state, None).into());
        self.drop_failed(failed);
    }

    fn drop_failed(&mut self, failed: Vec<PlayerId>) {
        for player in failed {
            self.leave(player);
        }
    }

    fn turn_key(&self) -> (Option<PlayerId>, u64, GameStatus) {
        (
            self.state.active_player(),
            self.state.turns_taken(),
            self.state.status(),
        )
    }

    fn turn_deadline(&self) -> Option<Instant> {
        let timeout = self.config.turn_timeout()?;
        if self.state.status() != GameStatus::Active || self.state.active_player().is_none() {
            return None;
        }
        Some(Instant::now() + timeout)
    }
}

async fn turn_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
