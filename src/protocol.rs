use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Host room commands
    CreateRoom {
        pack: Pack,
        settings: Option<RoomSettings>,
    },
    /// Re-authenticate as host after a reconnect
    HostResume {
        room_code: RoomCode,
        host_token: String,
    },
    HostSetState {
        room_code: RoomCode,
        state: RoomState,
    },
    HostAdvanceQuestion {
        room_code: RoomCode,
    },
    HostUpdateSetting {
        room_code: RoomCode,
        key: SettingKey,
        value: bool,
    },
    HostResolveDispute {
        room_code: RoomCode,
        question_id: QuestionId,
        action: DisputeAction,
        variant: Option<String>,
    },

    // Player messages
    Join {
        room_code: RoomCode,
        /// Stored id for rejoin; omitted on first join, the server issues one
        player_id: Option<PlayerId>,
        display_name: String,
        #[serde(default)]
        is_anonymous: bool,
    },
    /// Resume with a previously-stored player id (refreshes last-seen)
    Resume {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    /// Subscribe to a room without joining the roster (TV displays)
    Watch {
        room_code: RoomCode,
    },
    SubmitAnswer {
        room_code: RoomCode,
        question_id: QuestionId,
        answer: String,
    },

    // Poll channel
    CreatePoll {
        question: String,
        response_type: PollResponseType,
        options: Option<Vec<String>>,
        venue_name: Option<String>,
        logo_url: Option<String>,
    },
    PollJoin {
        poll_id: PollId,
        host_token: Option<String>,
    },
    PollSubmit {
        poll_id: PollId,
        text: Option<String>,
        option_id: Option<String>,
        device_id: DeviceId,
    },
    PollSetLocked {
        poll_id: PollId,
        locked: bool,
        host_token: Option<String>,
    },
    PollClear {
        poll_id: PollId,
        host_token: Option<String>,
    },
    PollReset {
        poll_id: PollId,
        host_token: Option<String>,
    },
    PollSetShowTicker {
        poll_id: PollId,
        show_ticker: bool,
        host_token: Option<String>,
    },
    PollExport {
        poll_id: PollId,
        host_token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DisputeAction {
    AcceptVariant,
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room_code: RoomCode,
        host_token: String,
        snapshot: RoomSnapshot,
    },
    HostResumed {
        snapshot: RoomSnapshot,
    },
    /// Sent to the joining player; carries the id to store for rejoin
    Joined {
        player_id: PlayerId,
        snapshot: RoomSnapshot,
    },
    /// Broadcast to all room subscribers after every state-affecting mutation
    Snapshot {
        snapshot: RoomSnapshot,
    },
    /// Broadcast when the host reveals the current answer
    Reveal {
        question_id: QuestionId,
        answer: AnswerKey,
        revealed_at: DateTime<Utc>,
    },
    /// Broadcast when the room enters the leaderboard state
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    SettingsChanged {
        settings: RoomSettings,
    },
    /// Submission ack; deliberately silent on correctness until the reveal
    SubmissionReceived {
        question_id: QuestionId,
        responses_count: usize,
    },
    DisputeResolved {
        question_id: QuestionId,
        action: DisputeAction,
    },

    PollCreated {
        poll_id: PollId,
        host_token: String,
        payload: PollPayload,
    },
    PollState {
        payload: PollPayload,
    },
    PollExportData {
        poll: Poll,
    },

    Error {
        code: String,
        msg: String,
    },
}

/// Public question info (answer key stripped to prevent spoilers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInfo {
    pub id: QuestionId,
    pub prompt: String,
    pub base_points: u32,
    pub time_limit_sec: u32,
    pub speed_bonus_enabled: bool,
}

impl From<&Question> for QuestionInfo {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            base_points: q.scoring.base_points,
            time_limit_sec: q.scoring.time_limit_sec,
            speed_bonus_enabled: q.scoring.speed_bonus_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub display_name: String,
    pub is_anonymous: bool,
    pub score: u32,
}

impl From<&Player> for PlayerInfo {
    fn from(p: &Player) -> Self {
        Self {
            player_id: p.player_id.clone(),
            display_name: p.display_name.clone(),
            is_anonymous: p.is_anonymous,
            score: p.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub correct_count: u32,
    pub answered_count: u32,
    pub percentage_correct: u32,
}

/// Everything a (re)connecting client needs in one shot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    pub state: RoomState,
    pub settings: RoomSettings,
    pub round_index: u32,
    pub current_question_index: usize,
    pub question: Option<QuestionInfo>,
    pub question_start_at: Option<DateTime<Utc>>,
    pub reveal_at: Option<DateTime<Utc>>,
    pub players: Vec<PlayerInfo>,
    /// How many responses the current question has collected (not their contents)
    pub responses_count: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupedEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResults {
    pub total: usize,
    pub top: Vec<GroupedEntry>,
    pub other_count: usize,
}

/// Poll view sent to subscribers. The display variant carries masked labels;
/// the host and player variants never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPayload {
    pub poll_id: PollId,
    pub question: String,
    pub response_type: PollResponseType,
    pub options: Vec<String>,
    pub locked: bool,
    pub show_ticker: bool,
    pub venue_name: Option<String>,
    pub logo_url: Option<String>,
    pub raw_responses_count: usize,
    pub grouped: GroupedResults,
    pub recent_submission: Option<String>,
}
