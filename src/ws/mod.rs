pub mod handlers;
mod host;
mod player;
mod poll;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{PollId, Role, RoomCode};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// Per-connection state: the role picked at upgrade time, host bindings
/// earned by creating or resuming with a token, and the broadcast topic the
/// connection currently follows.
#[derive(Debug)]
pub struct Session {
    pub role: Role,
    pub player_id: Option<String>,
    host_rooms: HashSet<RoomCode>,
    host_polls: HashSet<PollId>,
    pub subscription: Option<String>,
}

impl Session {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            player_id: None,
            host_rooms: HashSet::new(),
            host_polls: HashSet::new(),
            subscription: None,
        }
    }

    pub fn is_room_host(&self, code: &str) -> bool {
        self.host_rooms.contains(code)
    }

    pub fn bind_room_host(&mut self, code: &str) {
        self.host_rooms.insert(code.to_string());
    }

    pub fn is_poll_host(&self, poll_id: &str) -> bool {
        self.host_polls.contains(poll_id)
    }

    pub fn bind_poll_host(&mut self, poll_id: &str) {
        self.host_polls.insert(poll_id.to_string());
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(role = ?params.role, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let role = match params.role.as_deref() {
        Some("host") => Role::Host,
        Some("display") => Role::Display,
        _ => Role::Player,
    };

    tracing::info!(?role, "WebSocket connected");

    let mut session = Session::new(role);
    // The room/poll feed this connection follows; swapped when the session
    // joins a different code
    let mut feed: Option<broadcast::Receiver<ServerMessage>> = None;
    let mut feed_topic: Option<String> = None;

    loop {
        tokio::select! {
            // Room/poll broadcasts
            broadcast_msg = async {
                match &mut feed {
                    Some(rx) => rx.recv().await.ok(),
                    None => std::future::pending::<Option<ServerMessage>>().await,
                }
            } => {
                if let Some(msg) = broadcast_msg {
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &mut session, &state).await
                                {
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }

                                // Follow whichever code the session is now on
                                if session.subscription != feed_topic {
                                    if let Some(topic) = session.subscription.clone() {
                                        feed = Some(state.topics.subscribe(&topic).await);
                                        feed_topic = Some(topic);
                                    } else {
                                        feed = None;
                                        feed_topic = None;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(role = ?session.role, "WebSocket connection closed");
}
