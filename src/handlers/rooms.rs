use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::database::NewRoom;
use crate::state::AppState;

/// GET / - list all rooms
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    match state.rooms.get_all_rooms().await {
        Ok(rooms) => (StatusCode::OK, Json(rooms)).into_response(),
        Err(e) => {
            tracing::error!("failed to list rooms: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Could not retrieve rooms" })),
            )
                .into_response()
        }
    }
}

/// POST / - create a room (privileged role only)
///
/// The role check runs before the body is looked at, so an unprivileged
/// caller gets 403 even with a garbage payload.
pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<NewRoom>>,
) -> impl IntoResponse {
    if !state.policy.permits(user.role_id) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Access denied." })),
        )
            .into_response();
    }

    let body = body.map(|Json(b)| b).unwrap_or_default();
    let room_name = body.room_name.as_deref().unwrap_or("");
    let description = body.description.as_deref().unwrap_or("");
    if room_name.is_empty() || description.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Must designate room name to continue." })),
        )
            .into_response();
    }

    match state.rooms.add(room_name, description, user.role_id).await {
        Ok(room) => (StatusCode::CREATED, Json(room)).into_response(),
        Err(e) => {
            tracing::error!("failed to create room: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// DELETE /:id - remove a room (privileged role only)
pub async fn delete_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if !state.policy.permits(user.role_id) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Access denied." })),
        )
            .into_response();
    }

    // Absent ids fold into success; clients cannot tell the difference.
    match state.rooms.remove(id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": format!("room {} has been removed from DB", id) })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to delete room {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /:id/search - all posts in one room, newest first
pub async fn search_room_posts(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.rooms.search_with_room_id(id).await {
        Ok(posts) => (StatusCode::OK, Json(posts)).into_response(),
        Err(e) => {
            tracing::error!("room {} search failed: {}", id, e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": format!("Failed to fetch all posts for room with ID:{}", id)
                })),
            )
                .into_response()
        }
    }
}
