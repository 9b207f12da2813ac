use serde_json::Value;

/// Comparison operators a filter field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// Map a query-string operator token to an operator. `<>` is accepted as
    /// an alias for `!=`.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => FilterOp::Eq,
            "!=" | "<>" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Gte,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Lte,
            _ => return None,
        })
    }

    /// Canonical token, as it appears in rule keys like `filter:visible[=]`.
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `filter[field][op]=value` pair as parsed from the query string.
/// `op` is the raw token; `None` means no operator segment was given,
/// which resolves to `=` during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFilter {
    pub field: String,
    pub op: Option<String>,
    pub value: String,
}

/// One `sort[field]=direction` pair. An empty direction falls back to the
/// schema's default direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSort {
    pub field: String,
    pub direction: String,
}

/// One `page[attr]=value` pair, attribute not yet checked against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub attr: String,
    pub value: String,
}

/// Ephemeral, per-request query description. Built fresh from the query
/// string, never persisted, and fully validated before any SQL is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub filters: Vec<RawFilter>,
    pub sorts: Vec<RawSort>,
    pub page: Vec<RawPage>,
}

impl QueryRequest {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sorts.is_empty() && self.page.is_empty()
    }
}

/// A filter clause that passed schema and rule validation. The column comes
/// from the schema declaration, never from the request.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct BoundSort {
    pub column: String,
    pub direction: SortDirection,
}

/// Effective page window. Always 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Page { number: 1, size: 10 }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)).saturating_mul(i64::from(self.size))
    }
}

/// Fully validated and normalized query, ready for SQL generation.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub filters: Vec<BoundFilter>,
    pub sorts: Vec<BoundSort>,
    /// `None` only for schemas that disable pagination.
    pub page: Option<Page>,
}

/// Generated SQL text plus its positional parameters, in `$1..$n` order.
#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// One page of query results plus the derived page count.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub rows: Vec<T>,
    pub total_pages: i64,
}
