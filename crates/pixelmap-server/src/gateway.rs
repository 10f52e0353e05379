//! Connection gateway.
//!
//! One task pair per WebSocket: a writer draining the connection's bounded
//! outbound buffer into the socket, and a reader loop feeding paint requests
//! to the engine.

use std::future::pending;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, StreamExt};
use pixelmap_core::{Inbound, PaintOutcome, ServerMessage, decode_client};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ServerError;
use crate::registry::{ConnectionHandle, ConnectionId};
use crate::state::AppState;

const PING_PAYLOAD: &[u8] = b"pixelmap";

/// How long a closing connection's writer may spend flushing queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Entry point for every path other than the health check.
///
/// WebSocket upgrades are accepted on any path. Plain GETs get a banner,
/// anything else is a 404.
pub async fn entry(
    method: Method,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) if method == Method::GET => {
            (StatusCode::OK, "PixelMap server - connect via WebSocket").into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

struct Connection {
    id: ConnectionId,
    handle: ConnectionHandle,
    state: ConnectionState,
}

impl Connection {
    fn transition(&mut self, next: ConnectionState) {
        debug!(connection_id = %self.id, from = ?self.state, to = ?next, "Connection state change");
        self.state = next;
    }

    /// Reply to this connection only. A failed reply closes the connection.
    fn reply(&self, message: &ServerMessage) -> Result<(), ServerError> {
        self.handle.send(message)
    }
}

/// Drive one WebSocket connection until it closes.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Message>(state.settings.outbound_buffer.max(1));

    let mut conn = Connection {
        id: Uuid::new_v4(),
        handle: ConnectionHandle::new(tx),
        state: ConnectionState::Connecting,
    };

    match join(&state, &conn) {
        Ok(cells) => {
            conn.transition(ConnectionState::Open);
            info!(
                connection_id = %conn.id,
                cells,
                connections = state.registry.len(),
                "Client connected"
            );
        }
        Err(e) => {
            error!(connection_id = %conn.id, error = %e, "Failed to initialize connection");
            conn.transition(ConnectionState::Closed);
            return;
        }
    }

    let mut writer = tokio::spawn(writer_task(ws_sender, rx));
    let mut writer_done = false;

    let mut heartbeat = state.settings.ping_interval.map(|period| {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    });
    if let Some(timer) = heartbeat.as_mut() {
        // The first tick completes immediately.
        timer.tick().await;
    }

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_text(&state, &conn, text.as_str()) {
                            warn!(connection_id = %conn.id, error = %e, "Reply failed, closing");
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(
                            connection_id = %conn.id,
                            len = data.len(),
                            "Ignoring binary message"
                        );
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(connection_id = %conn.id, reason = ?frame, "Client initiated close");
                        break;
                    }
                    Some(Ok(_)) => {} // Ping/pong
                    Some(Err(e)) => {
                        warn!(connection_id = %conn.id, error = %e, "WebSocket receive error");
                        break;
                    }
                    None => {
                        debug!(connection_id = %conn.id, "WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = conn.handle.shutdown_requested() => {
                info!(connection_id = %conn.id, "Connection evicted");
                break;
            }

            _ = &mut writer => {
                debug!(connection_id = %conn.id, "Writer finished");
                writer_done = true;
                break;
            }

            _ = async {
                match heartbeat.as_mut() {
                    Some(timer) => timer.tick().await,
                    None => pending().await,
                }
            } => {
                if conn.handle.deliver(Message::Ping(Bytes::from_static(PING_PAYLOAD))).is_err() {
                    warn!(connection_id = %conn.id, "Ping could not be queued, closing");
                    break;
                }
            }
        }
    }

    state.registry.deregister(&conn.id);
    conn.transition(ConnectionState::Closed);
    info!(
        connection_id = %conn.id,
        connections = state.registry.len(),
        "Connection closed"
    );

    // Dropping the last sender lets the writer flush what is queued and close.
    let id = conn.id;
    drop(conn);
    if !writer_done {
        tokio::spawn(async move {
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
                debug!(connection_id = %id, "Writer drain timed out");
                writer.abort();
            }
        });
    }
}

/// Queue the INIT snapshot and register the connection as one step.
///
/// Both happen under the snapshot's read lock, so every paint is either in
/// the snapshot or broadcast to this connection afterwards.
fn join(state: &AppState, conn: &Connection) -> Result<usize, ServerError> {
    state.engine.snapshot_with(|cells| -> Result<usize, ServerError> {
        let count = cells.len();
        conn.handle.send(&ServerMessage::Init { data: cells })?;
        state.registry.register(conn.id, conn.handle.clone());
        Ok(count)
    })?
}

/// Handle one text frame. Errors mean this connection can no longer be
/// written to.
fn handle_text(state: &AppState, conn: &Connection, text: &str) -> Result<(), ServerError> {
    let request = match decode_client(text) {
        Ok(Inbound::Draw(request)) => request,
        Ok(Inbound::Ignored(kind)) => {
            debug!(connection_id = %conn.id, kind = %kind, "Ignoring message type");
            return Ok(());
        }
        Err(e) => {
            warn!(connection_id = %conn.id, error = %e, "Ignoring undecodable message");
            return Ok(());
        }
    };

    let now = state.clock.now_millis();
    match state.engine.try_paint(&request, now) {
        Ok(PaintOutcome::Accepted(cell)) => {
            info!(
                connection_id = %conn.id,
                x = cell.x,
                y = cell.y,
                owner = %cell.owner,
                "Cell painted"
            );
            let report = state.registry.broadcast(&ServerMessage::Update { data: cell })?;
            debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                evicted = report.evicted,
                "Update broadcast"
            );
            Ok(())
        }
        Ok(PaintOutcome::Rejected {
            owner,
            remaining_seconds,
        }) => {
            debug!(
                connection_id = %conn.id,
                held_by = %owner,
                remaining_seconds,
                "Paint rejected by cooldown"
            );
            conn.reply(&ServerMessage::cooldown(owner, remaining_seconds))
        }
        Ok(PaintOutcome::Invalid(reason)) => {
            debug!(connection_id = %conn.id, reason = %reason, "Malformed paint request");
            conn.reply(&ServerMessage::malformed(reason))
        }
        Err(e) => {
            error!(connection_id = %conn.id, error = %e, "Paint failed");
            conn.reply(&ServerMessage::internal())
        }
    }
}

/// Forward queued frames to the socket until the buffer closes or a send fails.
///
/// Frames queued before the last sender is dropped are still delivered.
async fn writer_task<S>(mut sink: S, mut rx: mpsc::Receiver<Message>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(msg) = rx.recv().await {
        if sink.send(msg).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
