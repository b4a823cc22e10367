//! Points computation, answer grading, and dispute resolution.
//!
//! The speed bonus is proportional to remaining time and only applies when
//! both the room setting and the question opt in. Base points are
//! unconditional; a late-but-correct answer still earns them.

use super::AppState;
use crate::protocol::DisputeAction;
use crate::types::*;
use chrono::{DateTime, Utc};

/// Shared comparison normalization: lowercase, strip punctuation, collapse
/// whitespace. Used for answer grading, accepted variants, and poll grouping.
pub fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Points for a response submitted at `submitted_at` to a question whose
/// clock started at `question_start_at`.
///
/// bonus = floor(remaining / time_limit * base), remaining clamped to
/// [0, time_limit]. With the bonus disabled at either level the result is
/// exactly the base points regardless of elapsed time.
pub fn compute_points(
    settings: &RoomSettings,
    question: &Question,
    question_start_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
) -> u32 {
    let base = question.scoring.base_points;

    if !(settings.speed_bonus_enabled && question.scoring.speed_bonus_enabled) {
        return base;
    }

    let limit = question.scoring.time_limit_sec as f64;
    if limit <= 0.0 {
        return base;
    }

    let elapsed = (submitted_at - question_start_at).num_milliseconds() as f64 / 1000.0;
    let remaining = (limit - elapsed).clamp(0.0, limit);
    let bonus = (remaining / limit * base as f64).floor() as u32;
    base + bonus
}

/// Does `answer` match the question's answer key (canonical text or any
/// accepted variant) under shared normalization?
pub fn grade_answer(question: &Question, answer: &str) -> bool {
    let key = normalize_text(answer);
    if key.is_empty() {
        return false;
    }
    normalize_text(&question.answer.text) == key
        || question
            .answer
            .accepted_variants
            .iter()
            .any(|v| normalize_text(v) == key)
}

impl AppState {
    /// Host-triggered correction of a question's answer key after the fact.
    ///
    /// `AcceptVariant` appends the normalized variant and regrades matching
    /// previously-incorrect ledger entries, crediting base points (the
    /// original elapsed time is not reliably recoverable, so no retroactive
    /// speed bonus). `Void` zeroes out everything credited for the question;
    /// a `voided` flag on the question makes a second void a no-op.
    pub async fn resolve_dispute(
        &self,
        code: &str,
        question_id: &str,
        action: DisputeAction,
        variant: Option<&str>,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            return false;
        };
        let Some(q_idx) = room.pack.questions.iter().position(|q| q.id == question_id) else {
            return false;
        };

        match action {
            DisputeAction::AcceptVariant => {
                let Some(variant) = variant else {
                    return false;
                };
                let normalized = normalize_text(variant);
                if normalized.is_empty() {
                    return false;
                }

                {
                    let question = &mut room.pack.questions[q_idx];
                    let already_known = normalize_text(&question.answer.text) == normalized
                        || question
                            .answer
                            .accepted_variants
                            .iter()
                            .any(|v| normalize_text(v) == normalized);
                    if !already_known {
                        question.answer.accepted_variants.push(normalized.clone());
                    }
                }

                // Regrade entries that were wrong only because the variant
                // was missing from the key
                let base = room.pack.questions[q_idx].scoring.base_points;
                for response in room
                    .responses
                    .iter_mut()
                    .filter(|r| r.question_id == question_id && !r.is_correct && !r.voided)
                {
                    if normalize_text(&response.answer) == normalized {
                        response.is_correct = true;
                        response.points_awarded = base;
                        if let Some(player) = room.players.get_mut(&response.player_id) {
                            player.score += base;
                            player.correct_count += 1;
                        }
                    }
                }

                tracing::info!(room_code = %code, question_id, %normalized, "Accepted answer variant");
                true
            }
            DisputeAction::Void => {
                if room.pack.questions[q_idx].voided {
                    // Voiding twice must not double-subtract
                    return false;
                }
                room.pack.questions[q_idx].voided = true;

                for response in room
                    .responses
                    .iter_mut()
                    .filter(|r| r.question_id == question_id && !r.voided)
                {
                    if let Some(player) = room.players.get_mut(&response.player_id) {
                        player.score = player.score.saturating_sub(response.points_awarded);
                        if response.is_correct {
                            player.correct_count = player.correct_count.saturating_sub(1);
                        }
                    }
                    // Entries stay in the ledger, annotated for audit
                    response.voided = true;
                }

                tracing::info!(room_code = %code, question_id, "Voided question");
                true
            }
        }
    }
}
