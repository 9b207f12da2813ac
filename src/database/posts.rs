use crate::querier::{
    Constraint, FilterOp, PageAttr, Querier, QuerySchema, Relation, RuleKey, RuleSet, SchemaError,
    SortDirection,
};

/// Select list shared by `GET /posts` and the per-room search, matching the
/// fields of [`crate::database::models::Post`].
pub(crate) const POST_SELECT: &str = "posts.id, posts.user_id, users.username, \
     rooms_to_posts.room_id, posts.visible, posts.likes, posts.created_at";

/// The joined relation both post queries run against.
pub(crate) const POST_FROM: &str = "posts \
     JOIN users ON posts.user_id = users.id \
     JOIN rooms_to_posts ON posts.id = rooms_to_posts.post_id";

/// Querier for `GET /posts`: clients may filter on `visible` (0 or 1) and
/// `room_id` (numeric), sort on `likes` and `created_at` (newest first by
/// default), and page with a size of at most 100 (default 10). Built once at
/// startup and shared read-only.
pub fn post_querier() -> Result<Querier, SchemaError> {
    let schema = QuerySchema::builder()
        .filter("visible", "posts.visible", &[FilterOp::Eq])
        .filter("room_id", "rooms_to_posts.room_id", &[FilterOp::Eq])
        .sort("likes", "posts.likes")
        .sort("created_at", "posts.created_at")
        .default_sort("created_at", SortDirection::Desc)
        .default_direction(SortDirection::Desc)
        .page(true)
        .default_page(1, 10)
        .build()?;

    let rules = RuleSet::new()
        .rule(
            RuleKey::filter("visible", FilterOp::Eq),
            Constraint::number().one_of(&[0, 1]),
        )
        .rule(RuleKey::filter("room_id", FilterOp::Eq), Constraint::number())
        .rule(RuleKey::page(PageAttr::Size), Constraint::number().max(100));

    Ok(Querier::new(
        schema,
        rules,
        Relation::new(POST_SELECT, POST_FROM, "posts.id"),
    ))
}
