//! Player and display message handlers

use crate::broadcast::room_topic;
use crate::protocol::ServerMessage;
use crate::state::{AppState, JoinRequest};
use std::sync::Arc;

use super::host::broadcast_snapshot;
use super::Session;

fn room_not_found() -> ServerMessage {
    ServerMessage::Error {
        code: "ROOM_NOT_FOUND".to_string(),
        msg: "Could not join — check the code".to_string(),
    }
}

pub async fn handle_join(
    state: &Arc<AppState>,
    session: &mut Session,
    room_code: String,
    player_id: Option<String>,
    display_name: String,
    is_anonymous: bool,
) -> Option<ServerMessage> {
    let join = JoinRequest {
        player_id,
        display_name,
        is_anonymous,
    };
    let Some(player) = state.upsert_player(&room_code, join).await else {
        return Some(room_not_found());
    };

    session.player_id = Some(player.player_id.clone());
    session.subscription = Some(room_topic(&room_code));

    // Everyone sees the roster change; the joiner additionally gets their id
    broadcast_snapshot(state, &room_code).await;
    let snapshot = state.build_room_snapshot(&room_code).await?;
    Some(ServerMessage::Joined {
        player_id: player.player_id,
        snapshot,
    })
}

pub async fn handle_resume(
    state: &Arc<AppState>,
    session: &mut Session,
    room_code: String,
    player_id: String,
) -> Option<ServerMessage> {
    let Some(player) = state.touch_player(&room_code, &player_id).await else {
        return Some(ServerMessage::Error {
            code: "UNKNOWN_PLAYER".to_string(),
            msg: "No such player in this room — join again".to_string(),
        });
    };

    session.player_id = Some(player.player_id.clone());
    session.subscription = Some(room_topic(&room_code));

    let snapshot = state.build_room_snapshot(&room_code).await?;
    Some(ServerMessage::Joined {
        player_id: player.player_id,
        snapshot,
    })
}

pub async fn handle_watch(
    state: &Arc<AppState>,
    session: &mut Session,
    room_code: String,
) -> Option<ServerMessage> {
    let Some(snapshot) = state.build_room_snapshot(&room_code).await else {
        return Some(room_not_found());
    };

    session.subscription = Some(room_topic(&room_code));
    Some(ServerMessage::Snapshot { snapshot })
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    session: &mut Session,
    room_code: String,
    question_id: String,
    answer: String,
) -> Option<ServerMessage> {
    let Some(player_id) = session.player_id.clone() else {
        return Some(ServerMessage::Error {
            code: "NOT_JOINED".to_string(),
            msg: "Join the room before answering".to_string(),
        });
    };

    match state
        .submit_answer(&room_code, &question_id, &player_id, &answer)
        .await
    {
        Ok(outcome) => {
            broadcast_snapshot(state, &room_code).await;
            // Correctness stays hidden until the reveal
            Some(ServerMessage::SubmissionReceived {
                question_id: outcome.question_id,
                responses_count: outcome.responses_count,
            })
        }
        Err(e) => Some(ServerMessage::Error {
            code: "SUBMISSION_REJECTED".to_string(),
            msg: e,
        }),
    }
}
