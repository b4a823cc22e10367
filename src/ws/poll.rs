//! Poll channel handlers
//!
//! Host authority here follows the capability model: a session counts as a
//! poll's host if it created the poll, or the moment it presents the poll's
//! token (which binds the session for the rest of the connection).

use crate::broadcast::{poll_display_topic, poll_topic};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::*;
use std::sync::Arc;

use super::Session;

fn poll_not_found() -> ServerMessage {
    ServerMessage::Error {
        code: "POLL_NOT_FOUND".to_string(),
        msg: "Unknown poll".to_string(),
    }
}

fn unauthorized(action: &str) -> ServerMessage {
    ServerMessage::Error {
        code: "UNAUTHORIZED".to_string(),
        msg: format!("Only the poll host can {}", action),
    }
}

/// Bound session, or a presented token that checks out (which binds)
async fn ensure_poll_host(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: &str,
    host_token: Option<&str>,
) -> bool {
    if session.is_poll_host(poll_id) {
        return true;
    }
    if let Some(token) = host_token {
        if state.check_poll_token(poll_id, token).await {
            session.bind_poll_host(poll_id);
            return true;
        }
    }
    false
}

/// Push the updated poll to both audiences: the unmasked payload to the
/// host/player topic and the masked one to the display topic. The ticker
/// entry is withheld from the display when the host has turned it off.
async fn broadcast_poll(state: &Arc<AppState>, poll: &Poll) {
    state
        .topics
        .publish(
            &poll_topic(&poll.poll_id),
            ServerMessage::PollState {
                payload: poll.payload(false),
            },
        )
        .await;

    let mut display_payload = poll.payload(true);
    if !poll.show_ticker {
        display_payload.recent_submission = None;
    }
    state
        .topics
        .publish(
            &poll_display_topic(&poll.poll_id),
            ServerMessage::PollState {
                payload: display_payload,
            },
        )
        .await;
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_create(
    state: &Arc<AppState>,
    session: &mut Session,
    question: String,
    response_type: PollResponseType,
    options: Option<Vec<String>>,
    venue_name: Option<String>,
    logo_url: Option<String>,
) -> Option<ServerMessage> {
    let new = crate::state::NewPoll {
        question,
        response_type: Some(response_type),
        options: options.unwrap_or_default(),
        venue_name,
        logo_url,
    };

    let Some(poll) = state.create_poll(new).await else {
        return Some(ServerMessage::Error {
            code: "INVALID_POLL".to_string(),
            msg: "Poll needs a question (and options for multiple choice)".to_string(),
        });
    };

    session.bind_poll_host(&poll.poll_id);
    session.subscription = Some(poll_topic(&poll.poll_id));

    Some(ServerMessage::PollCreated {
        poll_id: poll.poll_id.clone(),
        host_token: poll.host_token.clone(),
        payload: poll.payload(false),
    })
}

pub async fn handle_join(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    let Some(poll) = state.get_poll(&poll_id).await else {
        return Some(poll_not_found());
    };

    if let Some(token) = host_token.as_deref() {
        if state.check_poll_token(&poll_id, token).await {
            session.bind_poll_host(&poll_id);
        }
    }

    let is_display = session.role == Role::Display;
    session.subscription = Some(if is_display {
        poll_display_topic(&poll_id)
    } else {
        poll_topic(&poll_id)
    });

    let mut payload = poll.payload(is_display);
    if is_display && !poll.show_ticker {
        payload.recent_submission = None;
    }
    Some(ServerMessage::PollState { payload })
}

pub async fn handle_submit(
    state: &Arc<AppState>,
    poll_id: String,
    text: Option<String>,
    option_id: Option<String>,
    device_id: String,
) -> Option<ServerMessage> {
    let Some(poll) = state
        .submit_poll_response(&poll_id, text.as_deref(), option_id.as_deref(), &device_id)
        .await
    else {
        return Some(ServerMessage::Error {
            code: "SUBMISSION_REJECTED".to_string(),
            msg: "Poll is locked or the submission is invalid".to_string(),
        });
    };

    broadcast_poll(state, &poll).await;
    Some(ServerMessage::PollState {
        payload: poll.payload(false),
    })
}

pub async fn handle_set_locked(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    locked: bool,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    if !ensure_poll_host(state, session, &poll_id, host_token.as_deref()).await {
        return Some(unauthorized("lock or unlock it"));
    }
    let Some(poll) = state.set_poll_locked(&poll_id, locked).await else {
        return Some(poll_not_found());
    };

    broadcast_poll(state, &poll).await;
    Some(ServerMessage::PollState {
        payload: poll.payload(false),
    })
}

pub async fn handle_clear(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    if !ensure_poll_host(state, session, &poll_id, host_token.as_deref()).await {
        return Some(unauthorized("clear results"));
    }
    let Some(poll) = state.clear_poll_results(&poll_id).await else {
        return Some(poll_not_found());
    };

    broadcast_poll(state, &poll).await;
    Some(ServerMessage::PollState {
        payload: poll.payload(false),
    })
}

pub async fn handle_reset(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    if !ensure_poll_host(state, session, &poll_id, host_token.as_deref()).await {
        return Some(unauthorized("reset it"));
    }
    let Some(poll) = state.reset_poll(&poll_id).await else {
        return Some(poll_not_found());
    };

    broadcast_poll(state, &poll).await;
    Some(ServerMessage::PollState {
        payload: poll.payload(false),
    })
}

pub async fn handle_set_show_ticker(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    show_ticker: bool,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    if !ensure_poll_host(state, session, &poll_id, host_token.as_deref()).await {
        return Some(unauthorized("toggle the ticker"));
    }
    let Some(poll) = state.set_poll_show_ticker(&poll_id, show_ticker).await else {
        return Some(poll_not_found());
    };

    broadcast_poll(state, &poll).await;
    Some(ServerMessage::PollState {
        payload: poll.payload(false),
    })
}

/// Full raw data dump for the host (never masked)
pub async fn handle_export(
    state: &Arc<AppState>,
    session: &mut Session,
    poll_id: String,
    host_token: Option<String>,
) -> Option<ServerMessage> {
    if !ensure_poll_host(state, session, &poll_id, host_token.as_deref()).await {
        return Some(unauthorized("export it"));
    }
    let Some(poll) = state.get_poll(&poll_id).await else {
        return Some(poll_not_found());
    };

    Some(ServerMessage::PollExportData { poll })
}
