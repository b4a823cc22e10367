use super::AppState;
use crate::types::*;
use chrono::Utc;

/// States reachable from `from` via `update_room_state`.
///
/// `advance_to_next_question` is the one operation allowed to re-enter
/// `ActiveRound` outside this table; it moves the question pointer at the
/// same time, so the two stay consistent.
pub fn allowed_transitions(from: RoomState) -> &'static [RoomState] {
    use RoomState::*;

    match from {
        WaitingRoom => &[ReadyCheck, EndRoom],
        ReadyCheck => &[ActiveRound, EndRoom],
        ActiveRound => &[Reveal, EndRoom],
        Reveal => &[Leaderboard, EndRoom],
        Leaderboard => &[ActiveRound, Review, EndRoom],
        Review => &[Leaderboard, EndRoom],
        EndRoom => &[],
    }
}

fn is_valid_transition(from: RoomState, to: RoomState) -> bool {
    allowed_transitions(from).contains(&to)
}

impl AppState {
    /// Transition a room to `next`. Illegal edges return `false` with no
    /// mutation. Side effects are tied to the *target* state: entering
    /// `ActiveRound` stamps the question start, `Reveal` stamps the reveal
    /// time, `EndRoom` stamps the end time.
    pub async fn update_room_state(&self, code: &str, next: RoomState) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            return false;
        };

        if !is_valid_transition(room.state, next) {
            tracing::warn!(
                room_code = %code,
                from = ?room.state,
                to = ?next,
                "Rejected state transition"
            );
            return false;
        }

        room.state = next;
        let now = Utc::now();
        match next {
            RoomState::ActiveRound => {
                room.runtime.question_start_at = Some(now);
                room.runtime.reveal_at = None;
            }
            RoomState::Reveal => room.runtime.reveal_at = Some(now),
            RoomState::EndRoom => room.runtime.ended_at = Some(now),
            _ => {}
        }

        tracing::info!(room_code = %code, state = ?next, "Room state updated");
        true
    }

    /// Move to the next question: bump the pointer, force `ActiveRound`,
    /// restart the question clock, clear the reveal stamp. `false` with no
    /// mutation when the pack is exhausted. Reveal never auto-advances; the
    /// host lingers on a revealed answer until it calls this explicitly.
    pub async fn advance_to_next_question(&self, code: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            return false;
        };

        let next_index = room.runtime.current_question_index + 1;
        if next_index >= room.pack.questions.len() {
            return false;
        }

        room.runtime.current_question_index = next_index;
        room.runtime.round_index += 1;
        room.state = RoomState::ActiveRound;
        room.runtime.question_start_at = Some(Utc::now());
        room.runtime.reveal_at = None;

        tracing::info!(room_code = %code, question_index = next_index, "Advanced to next question");
        true
    }
}
