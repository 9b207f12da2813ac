use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: i32,
    pub room_name: String,
    pub description: String,
    pub creator_role: i32,
}

/// Body of `POST /`. Absent, null and empty-string fields all count as
/// missing, so both are plain options checked by the handler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRoom {
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
