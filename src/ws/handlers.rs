//! WebSocket message dispatch
//!
//! Main entry point for handling client messages. Role and host-authority
//! checks happen here, then messages are dispatched to the role-specific
//! handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{host, player, poll, Session};

/// Macro to require the host role and return early otherwise
macro_rules! check_host_role {
    ($session:expr, $action:expr) => {
        if $session.role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only a host connection can {}", $action),
            });
        }
    };
}

/// Macro to require host authority over a specific room (earned by creating
/// it or resuming with its token) and return early otherwise
macro_rules! check_room_host {
    ($session:expr, $room_code:expr, $action:expr) => {
        if !$session.is_room_host(&$room_code) {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the room host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Host room commands
        ClientMessage::CreateRoom { pack, settings } => {
            check_host_role!(session, "create rooms");
            host::handle_create_room(state, session, pack, settings).await
        }

        ClientMessage::HostResume {
            room_code,
            host_token,
        } => host::handle_resume(state, session, room_code, host_token).await,

        ClientMessage::HostSetState { room_code, state: next } => {
            check_room_host!(session, room_code, "change the room state");
            host::handle_set_state(state, room_code, next).await
        }

        ClientMessage::HostAdvanceQuestion { room_code } => {
            check_room_host!(session, room_code, "advance questions");
            host::handle_advance_question(state, room_code).await
        }

        ClientMessage::HostUpdateSetting {
            room_code,
            key,
            value,
        } => {
            check_room_host!(session, room_code, "update settings");
            host::handle_update_setting(state, room_code, key, value).await
        }

        ClientMessage::HostResolveDispute {
            room_code,
            question_id,
            action,
            variant,
        } => {
            check_room_host!(session, room_code, "resolve disputes");
            host::handle_resolve_dispute(state, room_code, question_id, action, variant).await
        }

        // Player messages
        ClientMessage::Join {
            room_code,
            player_id,
            display_name,
            is_anonymous,
        } => player::handle_join(state, session, room_code, player_id, display_name, is_anonymous)
            .await,

        ClientMessage::Resume {
            room_code,
            player_id,
        } => player::handle_resume(state, session, room_code, player_id).await,

        ClientMessage::Watch { room_code } => {
            player::handle_watch(state, session, room_code).await
        }

        ClientMessage::SubmitAnswer {
            room_code,
            question_id,
            answer,
        } => player::handle_submit_answer(state, session, room_code, question_id, answer).await,

        // Poll channel
        ClientMessage::CreatePoll {
            question,
            response_type,
            options,
            venue_name,
            logo_url,
        } => {
            check_host_role!(session, "create polls");
            poll::handle_create(
                state,
                session,
                question,
                response_type,
                options,
                venue_name,
                logo_url,
            )
            .await
        }

        ClientMessage::PollJoin {
            poll_id,
            host_token,
        } => poll::handle_join(state, session, poll_id, host_token).await,

        ClientMessage::PollSubmit {
            poll_id,
            text,
            option_id,
            device_id,
        } => poll::handle_submit(state, poll_id, text, option_id, device_id).await,

        ClientMessage::PollSetLocked {
            poll_id,
            locked,
            host_token,
        } => poll::handle_set_locked(state, session, poll_id, locked, host_token).await,

        ClientMessage::PollClear {
            poll_id,
            host_token,
        } => poll::handle_clear(state, session, poll_id, host_token).await,

        ClientMessage::PollReset {
            poll_id,
            host_token,
        } => poll::handle_reset(state, session, poll_id, host_token).await,

        ClientMessage::PollSetShowTicker {
            poll_id,
            show_ticker,
            host_token,
        } => poll::handle_set_show_ticker(state, session, poll_id, show_ticker, host_token).await,

        ClientMessage::PollExport {
            poll_id,
            host_token,
        } => poll::handle_export(state, session, poll_id, host_token).await,
    }
}
