use super::{scoring, AppState};
use crate::protocol::{LeaderboardEntry, PlayerInfo, QuestionInfo, RoomSnapshot};
use crate::types::*;
use chrono::Utc;

/// What a graded submission earned, echoed back to the submitting player
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub responses_count: usize,
}

fn append_response(room: &mut Room, record: ResponseRecord) {
    if let Some(player) = room.players.get_mut(&record.player_id) {
        player.answered_count += 1;
        if record.is_correct {
            player.correct_count += 1;
        }
        player.score += record.points_awarded;
        player.last_seen_at = record.submitted_at;
    }
    room.responses.push(record);
}

fn leaderboard_of(room: &Room, limit: usize) -> Vec<LeaderboardEntry> {
    let mut players: Vec<&Player> = room.players.values().collect();
    // Ties on score are broken by join order, so repeated calls are stable
    players.sort_by(|a, b| b.score.cmp(&a.score).then(a.join_order.cmp(&b.join_order)));

    players
        .into_iter()
        .take(limit)
        .map(|p| LeaderboardEntry {
            player_id: p.player_id.clone(),
            display_name: p.display_name.clone(),
            score: p.score,
            correct_count: p.correct_count,
            answered_count: p.answered_count,
            percentage_correct: if p.answered_count == 0 {
                0
            } else {
                (p.correct_count as f64 / p.answered_count as f64 * 100.0).round() as u32
            },
        })
        .collect()
}

fn snapshot_of(room: &Room) -> RoomSnapshot {
    let current_question = room.current_question();
    let responses_count = current_question
        .map(|q| {
            room.responses
                .iter()
                .filter(|r| r.question_id == q.id)
                .count()
        })
        .unwrap_or(0);

    let mut players: Vec<PlayerInfo> = room.players.values().map(PlayerInfo::from).collect();
    players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

    RoomSnapshot {
        room_code: room.code.clone(),
        state: room.state,
        settings: room.settings.clone(),
        round_index: room.runtime.round_index,
        current_question_index: room.runtime.current_question_index,
        question: current_question.map(QuestionInfo::from),
        question_start_at: room.runtime.question_start_at,
        reveal_at: room.runtime.reveal_at,
        players,
        responses_count,
        leaderboard: leaderboard_of(room, 10),
    }
}

impl AppState {
    /// Append a pre-graded response and fold it into the player aggregates.
    /// `false` only when the room is unknown.
    pub async fn record_response(
        &self,
        code: &str,
        question_id: &str,
        player_id: &str,
        answer: &str,
        points_awarded: u32,
        is_correct: bool,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            return false;
        };

        append_response(
            room,
            ResponseRecord {
                question_id: question_id.to_string(),
                player_id: player_id.to_string(),
                submitted_at: Utc::now(),
                answer: answer.to_string(),
                points_awarded,
                is_correct,
                voided: false,
            },
        );
        true
    }

    /// Grade and record one player's answer to the current question.
    /// Validation, grading, scoring, and the ledger append all happen under
    /// a single lock so nothing interleaves between read and write.
    pub async fn submit_answer(
        &self,
        code: &str,
        question_id: &str,
        player_id: &str,
        answer: &str,
    ) -> Result<SubmissionOutcome, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found")?;

        if room.state != RoomState::ActiveRound {
            return Err("Room is not accepting answers".to_string());
        }
        let question = room
            .current_question()
            .ok_or("Room has no current question")?;
        if question.id != question_id {
            return Err("Not the current question".to_string());
        }
        if !room.players.contains_key(player_id) {
            return Err("Join the room before answering".to_string());
        }
        if room
            .responses
            .iter()
            .any(|r| r.question_id == question_id && r.player_id == player_id)
        {
            return Err("Already answered this question".to_string());
        }

        let now = Utc::now();
        let is_correct = scoring::grade_answer(question, answer);
        let points_awarded = if is_correct {
            let started = room.runtime.question_start_at.unwrap_or(now);
            scoring::compute_points(&room.settings, question, started, now)
        } else {
            0
        };

        append_response(
            room,
            ResponseRecord {
                question_id: question_id.to_string(),
                player_id: player_id.to_string(),
                submitted_at: now,
                answer: answer.to_string(),
                points_awarded,
                is_correct,
                voided: false,
            },
        );

        let responses_count = room
            .responses
            .iter()
            .filter(|r| r.question_id == question_id)
            .count();

        tracing::debug!(
            room_code = %code,
            player_id,
            question_id,
            is_correct,
            points_awarded,
            "Answer recorded"
        );

        Ok(SubmissionOutcome {
            question_id: question_id.to_string(),
            is_correct,
            points_awarded,
            responses_count,
        })
    }

    /// All players annotated with their hit rate, best score first,
    /// truncated to `limit`
    pub async fn compute_leaderboard(&self, code: &str, limit: usize) -> Vec<LeaderboardEntry> {
        match self.rooms.read().await.get(code) {
            Some(room) => leaderboard_of(room, limit),
            None => Vec::new(),
        }
    }

    /// The complete view a (re)connecting client needs: room metadata, the
    /// roster, the current question stripped of its answer key, a count of
    /// responses to it, and the top-10 leaderboard.
    pub async fn build_room_snapshot(&self, code: &str) -> Option<RoomSnapshot> {
        self.rooms.read().await.get(code).map(snapshot_of)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_pack;
    use super::*;
    use crate::state::JoinRequest;

    async fn active_room(state: &AppState) -> RoomCode {
        let room = state.create_room(sample_pack(), None).await;
        for (id, name) in [("p1", "Alice"), ("p2", "Bob"), ("p3", "Carol")] {
            state
                .upsert_player(
                    &room.code,
                    JoinRequest {
                        player_id: Some(id.to_string()),
                        display_name: name.to_string(),
                        is_anonymous: false,
                    },
                )
                .await
                .unwrap();
        }
        assert!(state.update_room_state(&room.code, RoomState::ReadyCheck).await);
        assert!(
            state
                .update_room_state(&room.code, RoomState::ActiveRound)
                .await
        );
        room.code
    }

    #[tokio::test]
    async fn test_submit_grades_and_updates_aggregates() {
        let state = AppState::new();
        let code = active_room(&state).await;

        let outcome = state
            .submit_answer(&code, "q1", "p1", "Answer 1!")
            .await
            .unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.points_awarded, 2); // bonus off by default
        assert_eq!(outcome.responses_count, 1);

        let room = state.get_room(&code).await.unwrap();
        let p1 = &room.players["p1"];
        assert_eq!(p1.score, 2);
        assert_eq!(p1.correct_count, 1);
        assert_eq!(p1.answered_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_answer_counts_but_scores_zero() {
        let state = AppState::new();
        let code = active_room(&state).await;

        let outcome = state
            .submit_answer(&code, "q1", "p2", "nope")
            .await
            .unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.points_awarded, 0);

        let room = state.get_room(&code).await.unwrap();
        let p2 = &room.players["p2"];
        assert_eq!(p2.score, 0);
        assert_eq!(p2.correct_count, 0);
        assert_eq!(p2.answered_count, 1);
    }

    #[tokio::test]
    async fn test_second_submission_rejected() {
        let state = AppState::new();
        let code = active_room(&state).await;

        state.submit_answer(&code, "q1", "p1", "a").await.unwrap();
        let err = state.submit_answer(&code, "q1", "p1", "b").await;
        assert!(err.is_err());

        let room = state.get_room(&code).await.unwrap();
        assert_eq!(room.responses.len(), 1);
        assert_eq!(room.players["p1"].answered_count, 1);
    }

    #[tokio::test]
    async fn test_submit_outside_active_round_rejected() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;
        state
            .upsert_player(
                &room.code,
                JoinRequest {
                    player_id: Some("p1".to_string()),
                    display_name: "Alice".to_string(),
                    is_anonymous: false,
                },
            )
            .await
            .unwrap();

        let err = state.submit_answer(&room.code, "q1", "p1", "a").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_submit_to_stale_question_rejected() {
        let state = AppState::new();
        let code = active_room(&state).await;
        assert!(state.advance_to_next_question(&code).await);

        let err = state.submit_answer(&code, "q1", "p1", "a").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_leaderboard_ordering_and_tie_break() {
        let state = AppState::new();
        let code = active_room(&state).await;

        // p1 and p2 tie at 5, p3 leads with 10
        for (id, points) in [("p1", 5), ("p2", 5), ("p3", 10)] {
            assert!(
                state
                    .record_response(&code, "q1", id, "answer 1", points, true)
                    .await
            );
        }

        let first = state.compute_leaderboard(&code, 10).await;
        assert_eq!(first[0].player_id, "p3");
        assert_eq!(first[1].player_id, "p1"); // joined before p2
        assert_eq!(first[2].player_id, "p2");

        // Stable across repeated calls with no intervening mutation
        let second = state.compute_leaderboard(&code, 10).await;
        assert_eq!(first, second);

        let truncated = state.compute_leaderboard(&code, 2).await;
        assert_eq!(truncated.len(), 2);
    }

    #[tokio::test]
    async fn test_percentage_correct() {
        let state = AppState::new();
        let code = active_room(&state).await;

        state
            .record_response(&code, "q1", "p1", "answer 1", 2, true)
            .await;
        state
            .record_response(&code, "q2", "p1", "wrong", 0, false)
            .await;
        state
            .record_response(&code, "q3", "p1", "wrong", 0, false)
            .await;

        let board = state.compute_leaderboard(&code, 10).await;
        let p1 = board.iter().find(|e| e.player_id == "p1").unwrap();
        assert_eq!(p1.percentage_correct, 33);

        // Never-answered players divide safely
        let p2 = board.iter().find(|e| e.player_id == "p2").unwrap();
        assert_eq!(p2.percentage_correct, 0);
    }

    #[tokio::test]
    async fn test_snapshot_counts_only_current_question() {
        let state = AppState::new();
        let code = active_room(&state).await;

        state.submit_answer(&code, "q1", "p1", "answer 1").await.unwrap();
        state.submit_answer(&code, "q1", "p2", "nope").await.unwrap();

        let snap = state.build_room_snapshot(&code).await.unwrap();
        assert_eq!(snap.responses_count, 2);
        assert_eq!(snap.current_question_index, 0);
        assert_eq!(snap.players.len(), 3);
        assert!(snap.question.is_some());

        assert!(state.advance_to_next_question(&code).await);
        let snap = state.build_room_snapshot(&code).await.unwrap();
        assert_eq!(snap.current_question_index, 1);
        assert_eq!(snap.responses_count, 0);
    }

    #[tokio::test]
    async fn test_snapshot_unknown_room() {
        let state = AppState::new();
        assert!(state.build_room_snapshot("ZZZZZ").await.is_none());
    }

    #[tokio::test]
    async fn test_record_response_unknown_room() {
        let state = AppState::new();
        assert!(!state.record_response("ZZZZZ", "q1", "p1", "a", 1, true).await);
    }
}
