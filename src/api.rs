//! Registration endpoints.
//!
//! Request/response calls a client makes before opening its chat stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::{RelayError, RelayResult};
use crate::protocol::{CreateRoomRequest, CreateUserRequest};
use crate::state::AppState;
use crate::types::ChatRoom;

/// Register a user.
///
/// POST /api/users
///
/// `201` with the user, or `409 DUPLICATE_USER` if the id is taken.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> RelayResult<Response> {
    let user = state.register_user(req.user_id, req.user_name).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// Create a chat room, or return the one that already has this name.
///
/// POST /api/rooms
///
/// `201` when created, `200` when an existing room is reused, `409 DUPLICATE_ROOM`
/// when the server runs with the reject policy.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> RelayResult<Response> {
    let registration = state.register_room(req.channel_name).await?;
    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registration.room)).into_response())
}

/// List all chat rooms.
///
/// GET /api/rooms
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<ChatRoom>> {
    Json(state.list_rooms().await.collect())
}

/// Get one chat room with its members.
///
/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> RelayResult<Json<ChatRoom>> {
    state
        .get_room(&room_id)
        .await
        .map(Json)
        .ok_or(RelayError::RoomNotFound(room_id))
}

pub async fn health() -> &'static str {
    "ok"
}
