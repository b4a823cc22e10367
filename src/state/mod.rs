mod ledger;
mod machine;
mod poll;
mod room;
mod roster;
pub mod scoring;

pub use ledger::SubmissionOutcome;
pub use machine::allowed_transitions;
pub use poll::{mask_label, NewPoll};
pub use roster::JoinRequest;

use crate::broadcast::Topics;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
///
/// All stores are process-wide in-memory maps. Every mutator takes the
/// relevant lock once and runs to completion inside it, so per-room
/// operations are linearized by arrival order.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    pub polls: Arc<RwLock<HashMap<PollId, Poll>>>,
    /// Per-room / per-poll broadcast channels
    pub topics: Topics,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            polls: Arc::new(RwLock::new(HashMap::new())),
            topics: Topics::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_pack;
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_room() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        assert_eq!(room.state, RoomState::WaitingRoom);
        assert_eq!(room.runtime.current_question_index, 0);
        assert!(!room.host_token.is_empty());

        let fetched = state.get_room(&room.code).await;
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().code, room.code);
    }

    #[tokio::test]
    async fn test_get_unknown_room_is_none() {
        let state = AppState::new();
        assert!(state.get_room("ZZZZZ").await.is_none());
    }

    #[tokio::test]
    async fn test_room_codes_are_unique() {
        let state = AppState::new();
        let a = state.create_room(sample_pack(), None).await;
        let b = state.create_room(sample_pack(), None).await;
        assert_ne!(a.code, b.code);
        assert_ne!(a.host_token, b.host_token);
    }
}
