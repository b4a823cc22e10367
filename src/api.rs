//! Thin HTTP surface next to the WebSocket channel.
//!
//! Room creation is also offered over plain HTTP so venue tooling can
//! provision a room and hand the code/token to the host client out-of-band.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::state::AppState;
use crate::types::{Pack, RoomSettings};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("pack must contain at least one question")]
    EmptyPack,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::EmptyPack => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub pack: Pack,
    pub settings: Option<RoomSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_code: String,
    pub host_token: String,
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.pack.questions.is_empty() {
        return Err(ApiError::EmptyPack);
    }

    let room = state.create_room(request.pack, request.settings).await;
    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_code: room.code,
            host_token: room.host_token,
        }),
    ))
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnswerKey, Question, QuestionScoring};

    fn one_question_pack() -> Pack {
        Pack {
            name: "Smoke".to_string(),
            questions: vec![Question {
                id: "q1".to_string(),
                prompt: "?".to_string(),
                answer: AnswerKey {
                    text: "a".to_string(),
                    accepted_variants: Vec::new(),
                },
                scoring: QuestionScoring {
                    base_points: 1,
                    time_limit_sec: 30,
                    speed_bonus_enabled: false,
                },
                voided: false,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_room_returns_code_and_token() {
        let state = Arc::new(AppState::new());
        let response = create_room(
            State(state.clone()),
            Json(CreateRoomRequest {
                pack: one_question_pack(),
                settings: None,
            }),
        )
        .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_create_room_rejects_empty_pack() {
        let state = Arc::new(AppState::new());
        let response = create_room(
            State(state),
            Json(CreateRoomRequest {
                pack: Pack {
                    name: "Empty".to_string(),
                    questions: Vec::new(),
                },
                settings: None,
            }),
        )
        .await;
        assert!(matches!(response, Err(ApiError::EmptyPack)));
    }
}
