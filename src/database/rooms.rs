use sqlx::PgPool;

use crate::database::models::{Post, Room};
use crate::database::pool::StoreError;
use crate::database::posts::{POST_FROM, POST_SELECT};

/// Data access for rooms and the per-room post search.
#[derive(Debug, Clone)]
pub struct RoomStore {
    pool: PgPool,
}

impl RoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_all_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT id, room_name, description, creator_role FROM rooms",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rooms)
    }

    pub async fn add(
        &self,
        room_name: &str,
        description: &str,
        creator_role: i32,
    ) -> Result<Room, StoreError> {
        let room = sqlx::query_as::<_, Room>(
            "INSERT INTO rooms (room_name, description, creator_role) \
             VALUES ($1, $2, $3) \
             RETURNING id, room_name, description, creator_role",
        )
        .bind(room_name)
        .bind(description)
        .bind(creator_role)
        .fetch_one(&self.pool)
        .await?;
        Ok(room)
    }

    /// Delete a room. Removing an id that is already gone is not an error;
    /// callers get the same confirmation either way.
    pub async fn remove(&self, id: i32) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// All posts in a room, newest first, over the same join `GET /posts`
    /// queries.
    pub async fn search_with_room_id(&self, room_id: i32) -> Result<Vec<Post>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE rooms_to_posts.room_id = $1 ORDER BY posts.created_at DESC",
            POST_SELECT, POST_FROM
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }
}
