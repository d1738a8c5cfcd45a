//! WebSocket message dispatch
//!
//! Connections are already bound to a team and session, so every message
//! is forwarded to the game service under that identity.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::GameService;
use crate::types::{SessionId, TeamId};

/// Game misuse is absorbed by the team; only malformed identity is reported
fn bad_request(msg: &str) -> Option<ServerMessage> {
    Some(ServerMessage::Error {
        code: "BAD_REQUEST".to_string(),
        msg: msg.to_string(),
    })
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    team: &TeamId,
    session: &SessionId,
    game: &GameService,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Wait { wid } => {
            if wid.trim().is_empty() {
                return bad_request("wid must not be empty");
            }
            game.on_wait(team, session, &wid).await;
            None
        }

        ClientMessage::Place {
            wid,
            fragment,
            target,
        } => {
            game.place(team, session, &wid, &fragment, target).await;
            None
        }

        ClientMessage::Submit { answer, who } => {
            game.submit(team, session, &answer, &who).await;
            None
        }

        ClientMessage::SetName { who } => {
            game.set_name(team, session, &who).await;
            None
        }
    }
}
