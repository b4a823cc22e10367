use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type QuestionId = String;
pub type PollId = String;
pub type DeviceId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    WaitingRoom,
    ReadyCheck,
    ActiveRound,
    Reveal,
    Leaderboard,
    Review,
    EndRoom,
}

/// Host-toggleable room settings. Everything defaults on except auto-advance
/// and the speed bonus, which hosts opt into per show.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettings {
    pub leaderboards_visible_to_players: bool,
    pub leaderboards_visible_on_display: bool,
    pub mc_tips_enabled: bool,
    pub auto_advance_enabled: bool,
    pub speed_bonus_enabled: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            leaderboards_visible_to_players: true,
            leaderboards_visible_on_display: true,
            mc_tips_enabled: true,
            auto_advance_enabled: false,
            speed_bonus_enabled: false,
        }
    }
}

/// Which setting a `HostUpdateSetting` message targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    LeaderboardsVisibleToPlayers,
    LeaderboardsVisibleOnDisplay,
    McTipsEnabled,
    AutoAdvanceEnabled,
    SpeedBonusEnabled,
}

impl RoomSettings {
    pub fn set(&mut self, key: SettingKey, value: bool) {
        match key {
            SettingKey::LeaderboardsVisibleToPlayers => {
                self.leaderboards_visible_to_players = value
            }
            SettingKey::LeaderboardsVisibleOnDisplay => {
                self.leaderboards_visible_on_display = value
            }
            SettingKey::McTipsEnabled => self.mc_tips_enabled = value,
            SettingKey::AutoAdvanceEnabled => self.auto_advance_enabled = value,
            SettingKey::SpeedBonusEnabled => self.speed_bonus_enabled = value,
        }
    }
}

/// Per-question scoring parameters, authored with the pack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScoring {
    pub base_points: u32,
    pub time_limit_sec: u32,
    #[serde(default)]
    pub speed_bonus_enabled: bool,
}

/// Answer key for a question. `accepted_variants` grows when the host
/// accepts a disputed answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub text: String,
    #[serde(default)]
    pub accepted_variants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub answer: AnswerKey,
    pub scoring: QuestionScoring,
    /// Set once a void dispute has been resolved for this question
    #[serde(default)]
    pub voided: bool,
}

/// Externally-authored question content attached to a room at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pack {
    pub name: String,
    pub questions: Vec<Question>,
}

/// Nullable-until-transition timestamps plus the question pointer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRuntime {
    pub current_question_index: usize,
    pub round_index: u32,
    pub question_start_at: Option<DateTime<Utc>>,
    pub reveal_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: PlayerId,
    pub display_name: String,
    pub is_anonymous: bool,
    pub joined_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub score: u32,
    pub correct_count: u32,
    pub answered_count: u32,
    /// Roster insertion sequence, used as the leaderboard tie-break
    pub join_order: u32,
}

/// One entry in the append-only response ledger. Entries are never removed;
/// a void dispute annotates them in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub question_id: QuestionId,
    pub player_id: PlayerId,
    pub submitted_at: DateTime<Utc>,
    pub answer: String,
    pub points_awarded: u32,
    pub is_correct: bool,
    #[serde(default)]
    pub voided: bool,
}

/// One live game session, identified by a short public code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    pub host_token: String,
    pub state: RoomState,
    pub pack: Pack,
    pub settings: RoomSettings,
    pub runtime: RoomRuntime,
    pub players: HashMap<PlayerId, Player>,
    pub responses: Vec<ResponseRecord>,
}

impl Room {
    /// The question the room currently points at, if the pack has one
    pub fn current_question(&self) -> Option<&Question> {
        self.pack.questions.get(self.runtime.current_question_index)
    }
}

// ========== Polls ==========

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PollResponseType {
    /// Free text, one live answer per device
    Open,
    /// Fixed option set, matched case-insensitively
    Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub response_id: String,
    pub device_id: DeviceId,
    pub value: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_id: PollId,
    pub host_token: String,
    pub question: String,
    pub response_type: PollResponseType,
    pub options: Vec<String>,
    pub raw_responses: Vec<PollResponse>,
    pub locked: bool,
    pub venue_name: Option<String>,
    pub logo_url: Option<String>,
    pub show_ticker: bool,
    /// Most recent submission text, streamed to the display ticker
    pub recent_submission: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
    Display,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let s = RoomSettings::default();
        assert!(s.leaderboards_visible_to_players);
        assert!(s.leaderboards_visible_on_display);
        assert!(s.mc_tips_enabled);
        assert!(!s.auto_advance_enabled);
        assert!(!s.speed_bonus_enabled);
    }

    #[test]
    fn settings_set_by_key() {
        let mut s = RoomSettings::default();
        s.set(SettingKey::SpeedBonusEnabled, true);
        s.set(SettingKey::McTipsEnabled, false);
        assert!(s.speed_bonus_enabled);
        assert!(!s.mc_tips_enabled);
    }

    #[test]
    fn room_state_serializes_screaming_snake() {
        let json = serde_json::to_string(&RoomState::WaitingRoom).unwrap();
        assert_eq!(json, "\"WAITING_ROOM\"");
        let json = serde_json::to_string(&RoomState::ActiveRound).unwrap();
        assert_eq!(json, "\"ACTIVE_ROUND\"");
    }
}
