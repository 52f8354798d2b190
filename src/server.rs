//! Websocket transport in front of the session engine.
//!
//! Each connection joins the session on upgrade, then runs two tasks. The
//! writer drains the player's event stream into the socket. The reader
//! decodes frames into engine commands. Whichever side stops first ends the
//! connection, and the player leaves before the handler returns.

use std::future::Future;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::get;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::SessionHandle;
use crate::game::PlayerId;
use crate::protocol::{ClientCommand, ClientMessage, ProtocolError};
use crate::registry::EventReceiver;

/// Shared state for request handlers.
#[derive(Debug, Clone)]
struct AppState {
    session: SessionHandle,
}

/// Builds the HTTP router: `/ws` for players and `/health` for health checks.
pub fn router(session: SessionHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(ServiceBuilder::new().map_request(|req: Request| {
            debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(AppState { session })
}

/// Serves players on `listener` until `shutdown` resolves.
#[instrument(skip_all)]
pub async fn serve(
    listener: TcpListener,
    session: SessionHandle,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr()?, "Accepting websocket connections on /ws");
    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.session))
}

#[instrument(skip_all)]
async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    let (player, events) = match session.join().await {
        Ok(joined) => joined,
        Err(e) => {
            error!(error = %e, "Could not join session");
            return;
        }
    };
    info!(%player, "Connection opened");

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_events(player, events, sink));
    let mut reader = tokio::spawn(read_commands(player, stream, session.clone()));

    tokio::select! {
        _ = &mut writer => {
            debug!(%player, "Writer finished first");
            reader.abort();
        }
        _ = &mut reader => {
            debug!(%player, "Reader finished first");
        }
    }

    // Dropping the registry entry ends the writer once its queue drains.
    if let Err(e) = session.leave(player).await {
        warn!(%player, error = %e, "Leave not delivered");
    }
    info!(%player, "Connection closed");
}

async fn write_events(
    player: PlayerId,
    mut events: EventReceiver,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(event) = events.recv().await {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!(%player, error = %e, "Failed to encode event");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            warn!(%player, error = %e, "Delivery failed, closing connection");
            return;
        }
    }
    let _ = sink.close().await;
}

async fn read_commands(player: PlayerId, mut stream: SplitStream<WebSocket>, session: SessionHandle) {
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(%player, error = %e, "Read failed");
                return;
            }
        };

        let command = match frame {
            Message::Text(text) => ClientMessage::decode(text.as_str()),
            Message::Binary(_) => Err(ProtocolError::new("Binary frames are not supported")),
            Message::Close(_) => {
                debug!(%player, "Client closed connection");
                return;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let command = match command {
            Ok(command) => command,
            Err(e) => {
                warn!(%player, error = %e, "Malformed message, dropping connection");
                return;
            }
        };

        let delivered = match command {
            ClientCommand::Guess(character) => session
                .guess(player, character)
                .await
                .map(|report| debug!(%player, accepted = report.is_some(), "Guess handled")),
            ClientCommand::NewRound => session
                .new_round(player)
                .await
                .map(|started| debug!(%player, started, "New round handled")),
        };
        if let Err(e) = delivered {
            error!(%player, error = %e, "Session unavailable");
            return;
        }
    }
}
