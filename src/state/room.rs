use super::AppState;
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random short room code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a room with a fresh collision-checked code and host token.
    /// The room starts in the waiting room with a zeroed runtime and becomes
    /// visible to `get_room` immediately.
    pub async fn create_room(&self, pack: Pack, settings: Option<RoomSettings>) -> Room {
        let mut rooms = self.rooms.write().await;

        // Collision-check against live rooms (extremely rare with 24M codes)
        let code = loop {
            let candidate = generate_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = Room {
            code: code.clone(),
            host_token: ulid::Ulid::new().to_string(),
            state: RoomState::WaitingRoom,
            pack,
            settings: settings.unwrap_or_default(),
            runtime: RoomRuntime::default(),
            players: HashMap::new(),
            responses: Vec::new(),
        };

        rooms.insert(code, room.clone());
        tracing::info!(room_code = %room.code, "Room created");
        room
    }

    /// Pure lookup; absence is `None`, never an error
    pub async fn get_room(&self, code: &str) -> Option<Room> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Verify a host token against a live room
    pub async fn check_room_token(&self, code: &str, host_token: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(code)
            .is_some_and(|room| room.host_token == host_token)
    }

    /// Flip one named setting; returns the updated settings, `None` if the
    /// room is unknown
    pub async fn update_setting(
        &self,
        code: &str,
        key: SettingKey,
        value: bool,
    ) -> Option<RoomSettings> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code)?;
        room.settings.set(key, value);
        tracing::info!(room_code = %code, ?key, value, "Setting updated");
        Some(room.settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_pack;
    use super::*;

    #[test]
    fn test_code_alphabet() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_check_room_token() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        assert!(state.check_room_token(&room.code, &room.host_token).await);
        assert!(!state.check_room_token(&room.code, "wrong").await);
        assert!(!state.check_room_token("ZZZZZ", &room.host_token).await);
    }

    #[tokio::test]
    async fn test_update_setting() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        let updated = state
            .update_setting(&room.code, SettingKey::SpeedBonusEnabled, true)
            .await
            .unwrap();
        assert!(updated.speed_bonus_enabled);

        assert!(state
            .update_setting("ZZZZZ", SettingKey::SpeedBonusEnabled, true)
            .await
            .is_none());
    }
}
