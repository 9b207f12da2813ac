use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::RolePolicy;
use crate::database::{post_querier, RoomStore};
use crate::querier::{Querier, SchemaError};

/// Everything the handlers depend on, built once in `main` and cloned per
/// request. Schema, rules and policy are read-only after construction.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rooms: RoomStore,
    pub posts: Arc<Querier>,
    pub policy: RolePolicy,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self, SchemaError> {
        Ok(Self {
            rooms: RoomStore::new(pool.clone()),
            posts: Arc::new(post_querier()?),
            policy: RolePolicy::default(),
            pool,
        })
    }
}
