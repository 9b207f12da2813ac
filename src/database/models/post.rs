use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the posts join: the post itself, the author's username from
/// `users` and the owning room from `rooms_to_posts`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub room_id: i32,
    pub visible: i32,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}
