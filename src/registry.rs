//! Outbound channels of connected players.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::game::PlayerId;
use crate::protocol::ServerEvent;

/// Events a connection may have queued before it counts as stalled.
pub const OUTBOUND_QUEUE: usize = 1024;

/// Sending half of a player's event stream.
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Receiving half of a player's event stream.
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

/// Maps each connected player to its outbound channel.
///
/// Sends never wait on the network: each connection drains its own bounded
/// channel in a separate writer task. A failed send means that writer is
/// gone or has stopped reading. The failure is reported to the caller and
/// never stops delivery to the other recipients.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: BTreeMap<PlayerId, EventSender>,
    capacity: usize,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::with_capacity(OUTBOUND_QUEUE)
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry with [`OUTBOUND_QUEUE`] slots per player.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with `capacity` slots per player.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connections: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Registers `player` and returns the stream its connection should drain.
    pub fn register(&mut self, player: PlayerId) -> EventReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        if self.connections.insert(player, tx).is_some() {
            warn!(%player, "Replaced existing connection");
        }
        rx
    }

    /// Drops `player`'s channel, which ends its writer task.
    pub fn unregister(&mut self, player: PlayerId) -> bool {
        self.connections.remove(&player).is_some()
    }

    /// Whether `player` has a channel.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.connections.contains_key(&player)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Sends to one player. Returns `false` if the channel is closed or full,
    /// or the player is unknown.
    pub fn send_to(&self, player: PlayerId, event: ServerEvent) -> bool {
        match self.connections.get(&player) {
            Some(tx) => deliver(player, tx, event),
            None => {
                debug!(%player, "No connection for player");
                false
            }
        }
    }

    /// Sends to everyone. Returns the players whose delivery failed.
    pub fn broadcast(&self, event: &ServerEvent) -> Vec<PlayerId> {
        self.broadcast_filtered(event, |_| true)
    }

    /// Sends to everyone except `skip`. Returns the players whose delivery
    /// failed.
    pub fn broadcast_except(&self, skip: PlayerId, event: &ServerEvent) -> Vec<PlayerId> {
        self.broadcast_filtered(event, |player| player != skip)
    }

    fn broadcast_filtered(
        &self,
        event: &ServerEvent,
        include: impl Fn(PlayerId) -> bool,
    ) -> Vec<PlayerId> {
        let mut failed = Vec::new();
        for (player, tx) in &self.connections {
            if !include(*player) {
                continue;
            }
            if !deliver(*player, tx, event.clone()) {
                failed.push(*player);
            }
        }
        debug!(
            recipients = self.connections.len(),
            failed = failed.len(),
            "Broadcast complete"
        );
        failed
    }
}

fn deliver(player: PlayerId, tx: &EventSender, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(%player, "Outbound queue full, dropping stalled connection");
            false
        }
        Err(TrySendError::Closed(_)) => {
            warn!(%player, "Delivery failed, connection closed");
            false
        }
    }
}
