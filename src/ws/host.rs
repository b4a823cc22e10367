//! Host command handlers
//!
//! Role and per-room authority are checked in the dispatch layer before
//! these run. Every state-affecting command rebroadcasts the room snapshot
//! to all subscribers of the room's code.

use crate::broadcast::room_topic;
use crate::protocol::{DisputeAction, ServerMessage};
use crate::state::AppState;
use crate::types::*;
use std::sync::Arc;

use super::Session;

/// Rebroadcast the current snapshot to everyone in the room
pub async fn broadcast_snapshot(state: &Arc<AppState>, room_code: &str) {
    if let Some(snapshot) = state.build_room_snapshot(room_code).await {
        state
            .topics
            .publish(&room_topic(room_code), ServerMessage::Snapshot { snapshot })
            .await;
    }
}

pub async fn handle_create_room(
    state: &Arc<AppState>,
    session: &mut Session,
    pack: Pack,
    settings: Option<RoomSettings>,
) -> Option<ServerMessage> {
    if pack.questions.is_empty() {
        return Some(ServerMessage::Error {
            code: "EMPTY_PACK".to_string(),
            msg: "A room needs at least one question".to_string(),
        });
    }

    let room = state.create_room(pack, settings).await;
    session.bind_room_host(&room.code);
    session.subscription = Some(room_topic(&room.code));

    let snapshot = state.build_room_snapshot(&room.code).await?;
    Some(ServerMessage::RoomCreated {
        room_code: room.code,
        host_token: room.host_token,
        snapshot,
    })
}

pub async fn handle_resume(
    state: &Arc<AppState>,
    session: &mut Session,
    room_code: String,
    host_token: String,
) -> Option<ServerMessage> {
    if !state.check_room_token(&room_code, &host_token).await {
        return Some(ServerMessage::Error {
            code: "INVALID_HOST_TOKEN".to_string(),
            msg: "Room code and host token do not match".to_string(),
        });
    }

    session.bind_room_host(&room_code);
    session.subscription = Some(room_topic(&room_code));
    tracing::info!(%room_code, "Host resumed");

    let snapshot = state.build_room_snapshot(&room_code).await?;
    Some(ServerMessage::HostResumed { snapshot })
}

pub async fn handle_set_state(
    state: &Arc<AppState>,
    room_code: String,
    next: RoomState,
) -> Option<ServerMessage> {
    if !state.update_room_state(&room_code, next).await {
        return Some(ServerMessage::Error {
            code: "INVALID_TRANSITION".to_string(),
            msg: format!("Cannot move this room to {:?}", next),
        });
    }

    // Reveal and leaderboard entries get their own notices on top of the
    // snapshot so clients can react without diffing
    match next {
        RoomState::Reveal => {
            if let Some(room) = state.get_room(&room_code).await {
                if let (Some(question), Some(revealed_at)) =
                    (room.current_question(), room.runtime.reveal_at)
                {
                    state
                        .topics
                        .publish(
                            &room_topic(&room_code),
                            ServerMessage::Reveal {
                                question_id: question.id.clone(),
                                answer: question.answer.clone(),
                                revealed_at,
                            },
                        )
                        .await;
                }
            }
        }
        RoomState::Leaderboard => {
            let entries = state.compute_leaderboard(&room_code, 10).await;
            state
                .topics
                .publish(&room_topic(&room_code), ServerMessage::Leaderboard { entries })
                .await;
        }
        _ => {}
    }

    broadcast_snapshot(state, &room_code).await;
    let snapshot = state.build_room_snapshot(&room_code).await?;
    Some(ServerMessage::Snapshot { snapshot })
}

pub async fn handle_advance_question(
    state: &Arc<AppState>,
    room_code: String,
) -> Option<ServerMessage> {
    if !state.advance_to_next_question(&room_code).await {
        return Some(ServerMessage::Error {
            code: "ADVANCE_FAILED".to_string(),
            msg: "No more questions in the pack".to_string(),
        });
    }

    broadcast_snapshot(state, &room_code).await;
    let snapshot = state.build_room_snapshot(&room_code).await?;
    Some(ServerMessage::Snapshot { snapshot })
}

pub async fn handle_update_setting(
    state: &Arc<AppState>,
    room_code: String,
    key: SettingKey,
    value: bool,
) -> Option<ServerMessage> {
    let Some(settings) = state.update_setting(&room_code, key, value).await else {
        return Some(ServerMessage::Error {
            code: "ROOM_NOT_FOUND".to_string(),
            msg: "Unknown room code".to_string(),
        });
    };

    state
        .topics
        .publish(
            &room_topic(&room_code),
            ServerMessage::SettingsChanged {
                settings: settings.clone(),
            },
        )
        .await;
    broadcast_snapshot(state, &room_code).await;

    Some(ServerMessage::SettingsChanged { settings })
}

pub async fn handle_resolve_dispute(
    state: &Arc<AppState>,
    room_code: String,
    question_id: String,
    action: DisputeAction,
    variant: Option<String>,
) -> Option<ServerMessage> {
    let resolved = state
        .resolve_dispute(&room_code, &question_id, action, variant.as_deref())
        .await;
    if !resolved {
        return Some(ServerMessage::Error {
            code: "DISPUTE_FAILED".to_string(),
            msg: "Dispute could not be applied (unknown question, missing variant, or already voided)"
                .to_string(),
        });
    }

    state
        .topics
        .publish(
            &room_topic(&room_code),
            ServerMessage::DisputeResolved {
                question_id: question_id.clone(),
                action,
            },
        )
        .await;
    broadcast_snapshot(state, &room_code).await;

    Some(ServerMessage::DisputeResolved {
        question_id,
        action,
    })
}
