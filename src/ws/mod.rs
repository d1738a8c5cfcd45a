pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::channel::{Hub, SessionCredentials, TeamDirectory};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::GameService;
use crate::types::{SessionId, TeamId};

/// Shared state for the HTTP layer
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub game: Arc<GameService>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub team: Option<String>,
    pub session: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let credentials = SessionCredentials {
        team: params.team,
        session: params.session,
    };
    let Some((team, session)) = state.hub.check_session(&credentials) else {
        tracing::warn!("Rejected WebSocket without team/session: {:?}", credentials);
        return (StatusCode::UNAUTHORIZED, "team and session are required").into_response();
    };

    tracing::info!(team = %team, session = %session, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, team, session, state))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, team: TeamId, session: SessionId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Replay the current sticky state, then follow the team stream
    let (replay, mut team_rx) = state.hub.team(&team).subscribe();
    if let Some(msg) = replay {
        if !send_json(&mut sender, &msg).await {
            tracing::error!("Failed to send replay message");
            return;
        }
    }

    loop {
        tokio::select! {
            team_msg = team_rx.recv() => {
                match team_msg {
                    Ok(msg) => {
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(team = %team, skipped, "WebSocket lagged behind team stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &team, &session, &state.game).await
                                {
                                    if !send_json(&mut sender, &response).await {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                let _ = send_json(&mut sender, &error).await;
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

    tracing::info!(team = %team, session = %session, "WebSocket connection closed");
}
