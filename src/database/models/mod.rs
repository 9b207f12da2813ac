pub mod post;
pub mod room;

pub use post::Post;
pub use room::{NewRoom, Room};
