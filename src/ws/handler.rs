//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::session::SessionPhase;
use crate::game::WorldHandle;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::dispatch::{outbound_channel, OutboundRx, OutboundTx};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = outbound_channel();
    let writer_handle = tokio::spawn(write_outbound(session_id, ws_sink, outbound_rx));

    let rate_limiter = PlayerRateLimiter::new(state.config.movement_rate_limit);
    let phase = run_session(
        session_id,
        ws_stream,
        outbound_tx,
        &state.world,
        &rate_limiter,
    )
    .await;

    // The world dropped our queue on disconnect; the writer may still be mid-send
    writer_handle.abort();

    info!(session_id = %session_id, ?phase, "WebSocket connection closed");
}

/// Register with the world, pump inbound frames until the client goes away, then
/// retire the player. Returns the phase the session ended in.
pub(crate) async fn run_session<S, E>(
    session_id: Uuid,
    ws_stream: S,
    outbound_tx: OutboundTx,
    world: &WorldHandle,
    rate_limiter: &PlayerRateLimiter,
) -> SessionPhase
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut phase = SessionPhase::Connecting;

    match world.connect(session_id, outbound_tx).await {
        Ok(()) => {
            phase = phase.next();
            debug!(session_id = %session_id, ?phase, "Session registered");
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to register session");
        }
    }

    // Only a registered player has anything to retire
    if phase == SessionPhase::Active {
        read_inbound(session_id, ws_stream, world, rate_limiter).await;

        if let Err(e) = world.disconnect(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to deliver disconnect");
        }
        phase = phase.next();
    }

    phase
}

/// Reader loop: WebSocket -> world task
async fn read_inbound<S, E>(
    session_id: Uuid,
    mut ws_stream: S,
    world: &WorldHandle,
    rate_limiter: &PlayerRateLimiter,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "Rate limited movement message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Movement(payload)) => {
                        if world.movement(session_id, payload).await.is_err() {
                            debug!(session_id = %session_id, "World closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer loop: session queue -> WebSocket. Ends when the queue closes or a send fails.
async fn write_outbound(
    session_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: OutboundRx,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(session_id = %session_id, error = %e, "WebSocket send failed");
            break;
        }
    }

    let _ = ws_sink.close().await;
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
