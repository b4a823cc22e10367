use super::AppState;
use crate::types::*;
use chrono::Utc;

/// Fields a join/rejoin may carry
#[derive(Debug, Clone)]
pub struct JoinRequest {
    /// Stored id for rejoin; `None` on first join, the server issues one
    pub player_id: Option<PlayerId>,
    pub display_name: String,
    pub is_anonymous: bool,
}

impl AppState {
    /// Join and rejoin are the same operation: an existing id keeps its
    /// `joined_at` and all score aggregates, and only the presentation
    /// fields plus `last_seen_at` are refreshed. A second upsert with the
    /// same id never creates a second roster entry.
    ///
    /// Returns `None` if the room is unknown.
    pub async fn upsert_player(&self, code: &str, join: JoinRequest) -> Option<Player> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code)?;
        let now = Utc::now();

        let player_id = join
            .player_id
            .unwrap_or_else(|| ulid::Ulid::new().to_string());
        let display_name = resolve_display_name(&join.display_name, join.is_anonymous);

        let player = match room.players.get_mut(&player_id) {
            Some(existing) => {
                existing.display_name = display_name;
                existing.is_anonymous = join.is_anonymous;
                existing.last_seen_at = now;
                existing.clone()
            }
            None => {
                // Players are never removed, so the roster size is a stable
                // insertion sequence for the leaderboard tie-break
                let join_order = room.players.len() as u32;
                let player = Player {
                    player_id: player_id.clone(),
                    display_name,
                    is_anonymous: join.is_anonymous,
                    joined_at: now,
                    last_seen_at: now,
                    score: 0,
                    correct_count: 0,
                    answered_count: 0,
                    join_order,
                };
                room.players.insert(player_id.clone(), player.clone());
                player
            }
        };

        tracing::info!(room_code = %code, player_id = %player.player_id, "Player upserted");
        Some(player)
    }

    /// Refresh a known player's last-seen timestamp (session resume).
    /// Returns `None` if the room or player is unknown.
    pub async fn touch_player(&self, code: &str, player_id: &str) -> Option<Player> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code)?;
        let player = room.players.get_mut(player_id)?;
        player.last_seen_at = Utc::now();
        Some(player.clone())
    }
}

/// Anonymous joiners with a blank name get a friendly generated one
fn resolve_display_name(display_name: &str, is_anonymous: bool) -> String {
    let trimmed = display_name.trim();
    if trimmed.is_empty() && is_anonymous {
        petname::petname(2, "-").unwrap_or_else(|| "mystery-guest".to_string())
    } else if trimmed.is_empty() {
        "Guest".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sample_pack;
    use super::*;

    fn join(name: &str, id: Option<&str>) -> JoinRequest {
        JoinRequest {
            player_id: id.map(str::to_string),
            display_name: name.to_string(),
            is_anonymous: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        let first = state
            .upsert_player(&room.code, join("Alice", Some("p1")))
            .await
            .unwrap();

        // Give the player some score, then rejoin under a new name
        {
            let mut rooms = state.rooms.write().await;
            let p = rooms
                .get_mut(&room.code)
                .unwrap()
                .players
                .get_mut("p1")
                .unwrap();
            p.score = 7;
        }

        let second = state
            .upsert_player(&room.code, join("Alice the Great", Some("p1")))
            .await
            .unwrap();

        assert_eq!(second.player_id, "p1");
        assert_eq!(second.display_name, "Alice the Great");
        assert_eq!(second.joined_at, first.joined_at);
        assert_eq!(second.score, 7);

        let fetched = state.get_room(&room.code).await.unwrap();
        assert_eq!(fetched.players.len(), 1);
    }

    #[tokio::test]
    async fn test_server_issues_id_when_absent() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        let player = state
            .upsert_player(&room.code, join("Bob", None))
            .await
            .unwrap();
        assert!(!player.player_id.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_blank_name_gets_pet_name() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;

        let player = state
            .upsert_player(
                &room.code,
                JoinRequest {
                    player_id: None,
                    display_name: "  ".to_string(),
                    is_anonymous: true,
                },
            )
            .await
            .unwrap();
        assert!(!player.display_name.trim().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_unknown_room() {
        let state = AppState::new();
        assert!(state
            .upsert_player("ZZZZZ", join("Alice", None))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_touch_player() {
        let state = AppState::new();
        let room = state.create_room(sample_pack(), None).await;
        state
            .upsert_player(&room.code, join("Alice", Some("p1")))
            .await
            .unwrap();

        assert!(state.touch_player(&room.code, "p1").await.is_some());
        assert!(state.touch_player(&room.code, "p2").await.is_none());
    }
}
