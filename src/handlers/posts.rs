use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::database::Post;
use crate::state::AppState;

/// GET /posts - filtered, sorted, paged posts
///
/// The query string is handed to the posts querier as raw pairs; every
/// failure on the way to a result page, from a malformed key to a store
/// error, comes back as the same 400 with the underlying error text.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    match state.posts.run::<Post>(&state.pool, &params).await {
        Ok(page) => (
            StatusCode::OK,
            Json(json!({ "posts": page.rows, "totalPages": page.total_pages })),
        )
            .into_response(),
        Err(e) => {
            if !e.is_request_fault() {
                tracing::error!("posts query failed: {}", e);
            }
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": "Did not provide the proper query requirements",
                    "err": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
