//! WebSocket server and connection handling.

use crate::connections::Connections;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::{GameService, ServiceError, Submission};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub connections: Arc<Connections>,
    pub service: GameService,
}

impl ServerState {
    pub fn new(connections: Arc<Connections>, service: GameService) -> Self {
        Self {
            connections,
            service,
        }
    }

    fn send_error(&self, conn_id: Uuid, err: ServiceError) {
        let status = err.status_code();
        if status >= 500 {
            error!("Request from {} failed: {}", conn_id, err);
        } else {
            warn!("Request from {} rejected ({}): {}", conn_id, status, err);
        }
        self.connections.send(
            conn_id,
            ServerMessage::Error {
                status,
                message: err.to_string(),
            },
        );
    }

    fn send_submission(&self, conn_id: Uuid, submission: Submission) {
        for message in submission.warnings {
            self.connections
                .send(conn_id, ServerMessage::Warning { message });
        }
        self.connections.send(
            conn_id,
            ServerMessage::Saved {
                game_id: submission.game_id,
                message: submission.message,
            },
        );
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Settlers server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let conn_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.connections.register(conn_id, tx);
    info!(
        connections = state.connections.len(),
        "New WebSocket connection {} from {}", conn_id, addr
    );

    let welcome = ServerMessage::Welcome {
        connection_id: conn_id,
    };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    // The service may hit the disk, keep it off the async workers
                    let state = Arc::clone(&state);
                    let handled = tokio::task::spawn_blocking(move || {
                        handle_message(conn_id, client_msg, &state)
                    })
                    .await;
                    if let Err(e) = handled {
                        error!("Handler for {} failed: {}", conn_id, e);
                    }
                }
                Err(e) => {
                    warn!("Invalid message from {}: {}", conn_id, e);
                    state.connections.send(
                        conn_id,
                        ServerMessage::Error {
                            status: 400,
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", conn_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.connections.send(conn_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", conn_id, e);
                break;
            }
            _ => {}
        }
    }

    state.connections.remove(conn_id);
    send_task.abort();

    info!("Connection closed for {}", conn_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(conn_id: Uuid, msg: ClientMessage, state: &ServerState) {
    let user = state.connections.user_of(conn_id);
    let service = &state.service;

    match msg {
        ClientMessage::Authenticate { user_id } => {
            state.connections.authenticate(conn_id, user_id);
            info!("Connection {} authenticated as user {}", conn_id, user_id);
            state
                .connections
                .send(conn_id, ServerMessage::Authenticated { user_id });
        }

        ClientMessage::SaveProfile {
            name,
            email,
            favorite_colors,
        } => match service.save_profile(user, name, email, &favorite_colors) {
            Ok(account) => state.connections.send(
                conn_id,
                ServerMessage::ProfileSaved {
                    user_id: account.user_id,
                },
            ),
            Err(e) => state.send_error(conn_id, e),
        },

        ClientMessage::ListGames => match service.list_games() {
            Ok(games) => state
                .connections
                .send(conn_id, ServerMessage::GameList { games }),
            Err(e) => state.send_error(conn_id, e),
        },

        ClientMessage::NewGame { player_ids, board } => {
            match service.create_game(user, &player_ids, board) {
                Ok(game_id) => state
                    .connections
                    .send(conn_id, ServerMessage::GameCreated { game_id }),
                Err(e) => state.send_error(conn_id, e),
            }
        }

        ClientMessage::OpenGame { game_id } => match service.open_game(user, game_id) {
            Ok(view) => state
                .connections
                .send(conn_id, ServerMessage::GameView { view }),
            Err(e) => state.send_error(conn_id, e),
        },

        ClientMessage::SubmitTurn {
            game_id,
            turn,
            trade,
        } => match service.submit_turn(user, game_id, turn, trade) {
            Ok(submission) => state.send_submission(conn_id, submission),
            Err(e) => state.send_error(conn_id, e),
        },

        ClientMessage::RespondTrade { game_id, response } => {
            match service.respond_trade(user, game_id, response) {
                Ok(submission) => state.send_submission(conn_id, submission),
                Err(e) => state.send_error(conn_id, e),
            }
        }

        ClientMessage::GetGameData { game_id } => match service.game_document(game_id) {
            Ok(document) => state
                .connections
                .send(conn_id, ServerMessage::GameData { game_id, document }),
            Err(e) => state.send_error(conn_id, e),
        },

        ClientMessage::SetSync { game_id, is_sync } => {
            match service.set_sync(user, game_id, is_sync) {
                Ok(submission) => state.send_submission(conn_id, submission),
                Err(e) => state.send_error(conn_id, e),
            }
        }

        ClientMessage::Ping => {
            state.connections.send(conn_id, ServerMessage::Pong);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ConnectionNotifier;
    use crate::profiles::MemoryProfiles;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use settlers_core::FixedClock;

    fn state() -> ServerState {
        let connections = Arc::new(Connections::new());
        let notifier = Arc::new(ConnectionNotifier::new(Arc::clone(&connections), "test@localhost"));
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        let service = GameService::with_seed(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryProfiles::new()),
            notifier,
            clock,
            5,
        );
        ServerState::new(connections, service)
    }

    fn connect(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        state.connections.register(id, tx);
        (id, rx)
    }

    fn parse(text: serde_json::Value) -> ClientMessage {
        serde_json::from_value(text).unwrap()
    }

    #[test]
    fn test_anonymous_submission_rejected() {
        let state = state();
        let (conn, mut rx) = connect(&state);

        let msg = parse(json!({
            "type": "SubmitTurn",
            "payload": {"game_id": 1, "turn": {"roll": 7}}
        }));
        handle_message(conn, msg, &state);

        match rx.try_recv().unwrap() {
            ServerMessage::Error { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_players_are_notified_over_their_connections() {
        let state = state();
        let mut conns = Vec::new();
        for user_id in 1..=3 {
            let (conn, rx) = connect(&state);
            handle_message(conn, parse(json!({"type": "Authenticate", "payload": {"user_id": user_id}})), &state);
            handle_message(
                conn,
                parse(json!({
                    "type": "SaveProfile",
                    "payload": {"name": format!("p{}", user_id), "email": "", "favorite_colors": "red"}
                })),
                &state,
            );
            conns.push((user_id, conn, rx));
        }
        for (_, _, rx) in conns.iter_mut() {
            while rx.try_recv().is_ok() {}
        }

        let creator = conns[0].1;
        handle_message(
            creator,
            parse(json!({"type": "NewGame", "payload": {"player_ids": [1, 2, 3]}})),
            &state,
        );
        let game_id = match conns[0].2.try_recv().unwrap() {
            ServerMessage::GameCreated { game_id } => game_id,
            other => panic!("unexpected message {:?}", other),
        };

        let active = state
            .service
            .open_game(None, game_id)
            .unwrap()
            .active_player
            .unwrap()
            .id;
        let active_conn = conns.iter().find(|(u, _, _)| *u == active).unwrap().1;

        handle_message(active_conn, parse(json!({"type": "OpenGame", "payload": {"game_id": game_id}})), &state);
        handle_message(
            active_conn,
            parse(json!({"type": "SubmitTurn", "payload": {"game_id": game_id, "turn": {"roll": null}}})),
            &state,
        );

        for (user_id, _, rx) in conns.iter_mut() {
            let messages: Vec<ServerMessage> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
            let notified = messages
                .iter()
                .any(|m| matches!(m, ServerMessage::Notification { .. }));
            assert_eq!(notified, *user_id != active, "user {}", user_id);

            if *user_id == active {
                assert!(messages
                    .iter()
                    .any(|m| matches!(m, ServerMessage::Saved { .. })));
            }
        }
    }
}
