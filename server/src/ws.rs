use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::entity::ShipId;
use crate::fanout::{client_channels, spawn_workers};
use crate::game_loop::{GameBroadcast, GameCommand, JoinAccepted};
use crate::protocol::{ClientMsg, ServerMsg};

/// Malformed messages tolerated before the connection is closed
const MAX_PARSE_ERRORS: u32 = 5;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    pub fanout_capacity: usize,
    pub max_message_bytes: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let limit = app_state.max_message_bytes;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, stream) = socket.split();

    // Join the game
    let (channels, feeds) = client_channels(app_state.fanout_capacity);
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::PlayerJoin {
            channels,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PlayerJoin command");
        return;
    }

    let JoinAccepted {
        ship_id,
        welcome,
        ui,
        ships,
        dust,
    } = match resp_rx.await {
        Ok(accepted) => accepted,
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    tracing::info!("Player {} connected", ship_id);

    // Subscribe before the initial snapshots so nothing falls in between
    let broadcast_rx = app_state.broadcast_tx.subscribe();

    let mut greeted = true;
    for msg in [
        ServerMsg::Welcome(welcome),
        ServerMsg::Ui(ui),
        ServerMsg::Ships(ships),
    ] {
        if send_msg(&mut sink, &msg).await.is_err() {
            greeted = false;
            break;
        }
    }

    if greeted {
        let (out_tx, out_rx) = mpsc::channel(app_state.fanout_capacity.max(1));
        let workers = spawn_workers(feeds, dust, out_tx);
        run_session(ship_id, &app_state, sink, stream, out_rx, broadcast_rx).await;
        workers.abort();
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::PlayerLeave { id: ship_id })
        .await;
    tracing::info!("Player {} disconnected", ship_id);
}

/// Pump messages both ways until either side goes away.
async fn run_session(
    ship_id: ShipId,
    app_state: &AppState,
    mut sink: SplitSink<WebSocket, Message>,
    mut stream: SplitStream<WebSocket>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
    mut broadcast_rx: broadcast::Receiver<GameBroadcast>,
) {
    let mut parse_errors = 0u32;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(client_msg) => {
                                let cmd = match client_msg {
                                    ClientMsg::Movement(movement) => {
                                        GameCommand::Movement { id: ship_id, movement }
                                    }
                                    ClientMsg::Username(name) => {
                                        GameCommand::Username { id: ship_id, name }
                                    }
                                    ClientMsg::Skin(skin) => {
                                        GameCommand::Skin { id: ship_id, skin }
                                    }
                                };
                                if app_state.game_tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::warn!("Player {} sent malformed message: {}", ship_id, e);
                                if parse_errors > MAX_PARSE_ERRORS {
                                    tracing::warn!(
                                        "Player {} exceeded {} parse errors, closing",
                                        ship_id,
                                        MAX_PARSE_ERRORS
                                    );
                                    let _ = sink.send(Message::Close(None)).await;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        // Includes frames over the size limit
                        tracing::debug!("Player {} socket error: {}", ship_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (per-client fanout)
            Some(msg) = out_rx.recv() => {
                if send_msg(&mut sink, &msg).await.is_err() {
                    break;
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        let msg = match broadcast {
                            GameBroadcast::Ui(ui) => ServerMsg::Ui(ui),
                            GameBroadcast::Ships(ships) => ServerMsg::Ships(ships),
                        };
                        if send_msg(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Player {} lagged by {} messages", ship_id, n);
                        // Continue - ui and ships are full snapshots, dropping is fine
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            Ok(())
        }
    }
}
