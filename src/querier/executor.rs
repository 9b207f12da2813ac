use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Row};

use crate::querier::error::QuerierResult;
use crate::querier::parse;
use crate::querier::rules::{self, RuleSet};
use crate::querier::schema::QuerySchema;
use crate::querier::types::{BoundFilter, Paged, SqlResult, ValidatedQuery};

/// The pre-joined relation a querier runs against: select list, FROM clause
/// (joins included) and the expression handed to COUNT(). All three are
/// trusted SQL fragments owned by startup configuration.
#[derive(Debug, Clone)]
pub struct Relation {
    select: String,
    from: String,
    count_expr: String,
}

impl Relation {
    pub fn new(select: &str, from: &str, count_expr: &str) -> Self {
        Relation {
            select: select.to_string(),
            from: from.to_string(),
            count_expr: count_expr.to_string(),
        }
    }
}

/// One queryable endpoint: schema, rules and relation bundled at startup.
/// Turning a raw query string into rows happens in three steps, each usable
/// on its own: `interpret` (parse + validate), `to_select_sql`/`to_count_sql`
/// (SQL generation) and `run` (the two store round-trips).
#[derive(Debug, Clone)]
pub struct Querier {
    schema: QuerySchema,
    rules: RuleSet,
    relation: Relation,
}

impl Querier {
    pub fn new(schema: QuerySchema, rules: RuleSet, relation: Relation) -> Self {
        Querier {
            schema,
            rules,
            relation,
        }
    }

    /// Parse raw `key=value` pairs and validate them against the schema.
    pub fn interpret(&self, pairs: &[(String, String)]) -> QuerierResult<ValidatedQuery> {
        let request = parse::parse_pairs(pairs)?;
        rules::validate(&self.schema, &self.rules, &request)
    }

    /// Data query: filters, ordering and the page window.
    pub fn to_select_sql(&self, query: &ValidatedQuery) -> SqlResult {
        let (where_sql, params) = where_clause(&query.filters);
        let mut sql = format!("SELECT {} FROM {}", self.relation.select, self.relation.from);
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_sql));
        }
        if !query.sorts.is_empty() {
            let order = query
                .sorts
                .iter()
                .map(|s| format!("{} {}", quote_column(&s.column), s.direction.to_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some(page) = query.page {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", page.limit(), page.offset()));
        }
        SqlResult { query: sql, params }
    }

    /// Count query over the same join shape. The WHERE text and parameters
    /// are generated from the same validated filters as the data query, so
    /// the two can never disagree on which rows qualify.
    pub fn to_count_sql(&self, query: &ValidatedQuery) -> SqlResult {
        let (where_sql, params) = where_clause(&query.filters);
        let mut sql = format!(
            "SELECT COUNT({}) as count FROM {}",
            self.relation.count_expr, self.relation.from
        );
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_sql));
        }
        SqlResult { query: sql, params }
    }

    /// Interpret the query string, then issue the data and count queries
    /// concurrently. No transaction spans the two reads; a writer landing
    /// between them can skew `total_pages` by one and that is accepted.
    pub async fn run<T>(&self, pool: &PgPool, pairs: &[(String, String)]) -> QuerierResult<Paged<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = self.interpret(pairs)?;
        let select = self.to_select_sql(&query);
        let count_sql = self.to_count_sql(&query);
        tracing::debug!(sql = %select.query, "running filtered query");

        let (rows, count) = tokio::try_join!(
            fetch_rows::<T>(pool, &select),
            fetch_count(pool, &count_sql)
        )?;

        let total_pages = match query.page {
            Some(page) => total_pages(count, page.size),
            None if count > 0 => 1,
            None => 0,
        };

        Ok(Paged { rows, total_pages })
    }
}

/// `ceil(count / page_size)`, with an empty result reporting zero pages.
pub fn total_pages(count: i64, page_size: u32) -> i64 {
    if count <= 0 {
        return 0;
    }
    let size = i64::from(page_size.max(1));
    (count + size - 1) / size
}

fn where_clause(filters: &[BoundFilter]) -> (String, Vec<Value>) {
    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        conditions.push(format!(
            "{} {} ${}",
            quote_column(&filter.column),
            filter.op.to_sql(),
            i + 1
        ));
        params.push(filter.value.clone());
    }
    (conditions.join(" AND "), params)
}

fn quote_column(column: &str) -> String {
    column
        .split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join(".")
}

async fn fetch_rows<T>(pool: &PgPool, sql: &SqlResult) -> QuerierResult<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query_as(q, p);
    }
    Ok(q.fetch_all(pool).await?)
}

async fn fetch_count(pool: &PgPool, sql: &SqlResult) -> QuerierResult<i64> {
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        other => q.bind(other.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        other => q.bind(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::querier::rules::{Constraint, RuleKey};
    use crate::querier::types::{FilterOp, SortDirection};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn querier() -> Querier {
        let schema = QuerySchema::builder()
            .filter("visible", "posts.visible", &[FilterOp::Eq])
            .filter("room_id", "rooms_to_posts.room_id", &[FilterOp::Eq])
            .sort("likes", "posts.likes")
            .sort("created_at", "posts.created_at")
            .default_sort("created_at", SortDirection::Desc)
            .default_direction(SortDirection::Desc)
            .page(true)
            .build()
            .unwrap();
        let rules = RuleSet::new()
            .rule(
                RuleKey::filter("visible", FilterOp::Eq),
                Constraint::number().one_of(&[0, 1]),
            )
            .rule(RuleKey::filter("room_id", FilterOp::Eq), Constraint::number())
            .rule(
                RuleKey::page(crate::querier::rules::PageAttr::Size),
                Constraint::number().max(100),
            );
        Querier::new(schema, rules, Relation::new("*", "posts", "*"))
    }

    #[test]
    fn bare_request_selects_the_default_window() {
        let q = querier();
        let query = q.interpret(&[]).unwrap();
        let sql = q.to_select_sql(&query);

        assert_eq!(
            sql.query,
            "SELECT * FROM posts ORDER BY \"posts\".\"created_at\" DESC LIMIT 10 OFFSET 0"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn filters_become_numbered_parameters() {
        let q = querier();
        let query = q
            .interpret(&pairs(&[
                ("filter[visible][=]", "1"),
                ("filter[room_id][=]", "5"),
                ("page[size]", "10"),
            ]))
            .unwrap();
        let sql = q.to_select_sql(&query);

        assert!(
            sql.query.contains(
                "WHERE \"posts\".\"visible\" = $1 AND \"rooms_to_posts\".\"room_id\" = $2"
            ),
            "{}",
            sql.query
        );
        assert_eq!(
            sql.params,
            vec![Value::Number(1.into()), Value::Number(5.into())]
        );
    }

    #[test]
    fn count_query_shares_where_text_and_params() {
        let q = querier();
        let query = q
            .interpret(&pairs(&[
                ("filter[visible][=]", "1"),
                ("filter[room_id][=]", "5"),
            ]))
            .unwrap();
        let select = q.to_select_sql(&query);
        let count = q.to_count_sql(&query);

        let where_text = "WHERE \"posts\".\"visible\" = $1 AND \"rooms_to_posts\".\"room_id\" = $2";
        assert!(select.query.contains(where_text), "{}", select.query);
        assert!(count.query.contains(where_text), "{}", count.query);
        assert_eq!(select.params, count.params);

        assert!(count.query.starts_with("SELECT COUNT(*) as count FROM posts"));
        assert!(!count.query.contains("ORDER BY"));
        assert!(!count.query.contains("LIMIT"));
    }

    #[test]
    fn page_window_maps_to_limit_offset() {
        let q = querier();
        let query = q
            .interpret(&pairs(&[("page[number]", "3"), ("page[size]", "25")]))
            .unwrap();
        let sql = q.to_select_sql(&query);
        assert!(sql.query.ends_with("LIMIT 25 OFFSET 50"), "{}", sql.query);
    }

    #[test]
    fn explicit_sort_overrides_the_default_order() {
        let q = querier();
        let query = q.interpret(&pairs(&[("sort[likes]", "asc")])).unwrap();
        let sql = q.to_select_sql(&query);
        assert!(
            sql.query.contains("ORDER BY \"posts\".\"likes\" ASC"),
            "{}",
            sql.query
        );
        assert!(!sql.query.contains("created_at"));
    }

    #[test]
    fn schema_without_sort_or_page_emits_neither_clause() {
        let schema = QuerySchema::builder()
            .filter("visible", "posts.visible", &[FilterOp::Eq])
            .build()
            .unwrap();
        let q = Querier::new(schema, RuleSet::new(), Relation::new("*", "posts", "*"));
        let query = q.interpret(&pairs(&[("filter[visible]", "1")])).unwrap();
        let sql = q.to_select_sql(&query);
        assert_eq!(sql.query, "SELECT * FROM posts WHERE \"posts\".\"visible\" = $1");
    }

    #[test]
    fn total_pages_is_a_ceiling_division() {
        // via the crate-level re-export, like external callers use it
        assert_eq!(crate::querier::total_pages(25, 10), 3);

        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(100, 100), 1);
        assert_eq!(total_pages(-5, 10), 0);
    }

    #[test]
    fn invalid_requests_never_reach_sql_generation() {
        let q = querier();
        assert!(q.interpret(&pairs(&[("filter[author]", "7")])).is_err());
        assert!(q.interpret(&pairs(&[("filter[visible][=]", "2")])).is_err());
        assert!(q.interpret(&pairs(&[("page[size]", "101")])).is_err());
    }
}
