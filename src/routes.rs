use axum::routing::{delete, get};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{health, posts, rooms};
use crate::state::AppState;

/// Build the router. Every dependency arrives through `state`; nothing in
/// here reads globals, so tests hand in whatever state they want.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Rooms
        .route("/", get(rooms::list_rooms).post(rooms::create_room))
        .route("/:id", delete(rooms::delete_room))
        .route("/:id/search", get(rooms::search_room_posts))
        // Posts ("/posts" is static, so it wins over "/:id")
        .route("/posts", get(posts::list_posts))
        // Operational
        .route("/health", get(health::health))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
