pub mod models;
pub mod pool;
pub mod posts;
pub mod rooms;

pub use models::{NewRoom, Post, Room};
pub use pool::{connect, health_check, StoreError};
pub use posts::post_querier;
pub use rooms::RoomStore;
