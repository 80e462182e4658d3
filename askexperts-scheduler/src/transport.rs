//! Worker-facing WebSocket endpoint, following the recv-loop style of
//! `openibank-api::websocket` adapted to also drain an outbound channel so a
//! single task owns both directions of one connection.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{Command, CommandSender};
use crate::protocol::WorkerMessage;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub async fn ws_worker_handler(ws: WebSocketUpgrade, State(commands): State<CommandSender>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_worker_socket(socket, commands))
}

async fn handle_worker_socket(mut socket: WebSocket, commands: CommandSender) {
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    if commands
        .send(Command::ConnectionOpened {
            conn_id,
            outbound: outbound_tx,
        })
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<WorkerMessage>(&text) {
                        Ok(frame) => {
                            if commands.send(Command::Frame { conn_id, frame }).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, conn_id, "malformed worker frame, ignoring"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, conn_id, "worker socket error");
                        break;
                    }
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(err) => {
                                warn!(error = %err, conn_id, "failed to encode scheduler frame");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    debug!(conn_id, "worker connection closed");
    let _ = commands.send(Command::ConnectionClosed { conn_id });
}
