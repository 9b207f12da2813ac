use serde_json::Value;

use crate::querier::error::QuerierError;
use crate::querier::schema::QuerySchema;
use crate::querier::types::{
    BoundFilter, BoundSort, FilterOp, Page, QueryRequest, SortDirection, ValidatedQuery,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAttr {
    Number,
    Size,
}

impl PageAttr {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "number" => Some(PageAttr::Number),
            "size" => Some(PageAttr::Size),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageAttr::Number => "number",
            PageAttr::Size => "size",
        }
    }
}

/// Identifies the request value a rule constrains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKey {
    Filter { field: String, op: FilterOp },
    Page(PageAttr),
}

impl RuleKey {
    pub fn filter(field: &str, op: FilterOp) -> Self {
        RuleKey::Filter {
            field: field.to_string(),
            op,
        }
    }

    pub fn page(attr: PageAttr) -> Self {
        RuleKey::Page(attr)
    }

    /// Key as it reads in error messages: `filter:visible[=]`, `page:size`.
    pub fn label(&self) -> String {
        match self {
            RuleKey::Filter { field, op } => format!("filter:{}[{}]", field, op.token()),
            RuleKey::Page(attr) => format!("page:{}", attr.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    Text,
}

/// Constraint descriptor for one rule key: an expected primitive type plus
/// optional allowed-set and bound checks. Numeric bounds apply only to
/// `Number` values.
#[derive(Debug, Clone)]
pub struct Constraint {
    expects: ValueType,
    one_of: Option<Vec<i64>>,
    min: Option<i64>,
    max: Option<i64>,
}

impl Constraint {
    pub fn number() -> Self {
        Constraint {
            expects: ValueType::Number,
            one_of: None,
            min: None,
            max: None,
        }
    }

    pub fn text() -> Self {
        Constraint {
            expects: ValueType::Text,
            one_of: None,
            min: None,
            max: None,
        }
    }

    pub fn one_of(mut self, allowed: &[i64]) -> Self {
        self.one_of = Some(allowed.to_vec());
        self
    }

    pub fn min(mut self, bound: i64) -> Self {
        self.min = Some(bound);
        self
    }

    pub fn max(mut self, bound: i64) -> Self {
        self.max = Some(bound);
        self
    }

    /// Check a raw query-string value and return its normalized form, ready
    /// to bind as a SQL parameter.
    pub fn check(&self, label: &str, raw: &str) -> Result<Value, QuerierError> {
        match self.expects {
            ValueType::Number => {
                let n: i64 = raw.parse().map_err(|_| {
                    QuerierError::invalid(format!("{} must be a number (got '{}')", label, raw))
                })?;
                if let Some(allowed) = &self.one_of {
                    if !allowed.contains(&n) {
                        return Err(QuerierError::invalid(format!(
                            "{} must be one of {:?} (got {})",
                            label, allowed, n
                        )));
                    }
                }
                if let Some(min) = self.min {
                    if n < min {
                        return Err(QuerierError::invalid(format!(
                            "{} must be at least {} (got {})",
                            label, min, n
                        )));
                    }
                }
                if let Some(max) = self.max {
                    if n > max {
                        return Err(QuerierError::invalid(format!(
                            "{} must not exceed {} (got {})",
                            label, max, n
                        )));
                    }
                }
                Ok(Value::Number(n.into()))
            }
            ValueType::Text => Ok(Value::String(raw.to_string())),
        }
    }
}

/// Ordered list of `(key, constraint)` pairs. Rules run in declaration
/// order and the first failure is the one reported.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(RuleKey, Constraint)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, key: RuleKey, constraint: Constraint) -> Self {
        self.rules.push((key, constraint));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RuleKey, Constraint)> {
        self.rules.iter()
    }

    pub fn get(&self, key: &RuleKey) -> Option<&Constraint> {
        self.rules.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }
}

/// Page values must always be positive integers, before any user-declared
/// rule gets a say.
fn base_rules() -> RuleSet {
    RuleSet::new()
        .rule(RuleKey::page(PageAttr::Number), Constraint::number().min(1))
        .rule(RuleKey::page(PageAttr::Size), Constraint::number().min(1))
}

struct PendingFilter {
    key: RuleKey,
    column: String,
    op: FilterOp,
    raw: String,
    value: Option<Value>,
}

/// Check a parsed request against the schema and rules and normalize it.
///
/// Two passes: first every key in the request must exist in the schema
/// (unknown fields, undeclared operators, and page attributes fail here as
/// schema violations), then the rules run in declaration order and the first
/// constraint failure wins. Defaults for sort and page are filled in last.
/// Pure: no store access, no side effects.
pub fn validate(
    schema: &QuerySchema,
    rules: &RuleSet,
    request: &QueryRequest,
) -> Result<ValidatedQuery, QuerierError> {
    // Schema pass: filters.
    let mut pending: Vec<PendingFilter> = Vec::new();
    for raw in &request.filters {
        let field = schema.filter_field(&raw.field).ok_or_else(|| {
            QuerierError::schema(format!("'{}' is not a filterable field", raw.field))
        })?;
        let op = match &raw.op {
            None => FilterOp::Eq,
            Some(token) => FilterOp::from_token(token).ok_or_else(|| {
                QuerierError::schema(format!("unsupported filter operator '{}'", token))
            })?,
        };
        if !field.ops.contains(&op) {
            return Err(QuerierError::schema(format!(
                "operator '{}' is not allowed for filter '{}'",
                op.token(),
                raw.field
            )));
        }
        let key = RuleKey::filter(&raw.field, op);
        if pending.iter().any(|p| p.key == key) {
            return Err(QuerierError::invalid(format!(
                "{} given more than once",
                key.label()
            )));
        }
        pending.push(PendingFilter {
            key,
            column: field.column.clone(),
            op,
            raw: raw.value.clone(),
            value: None,
        });
    }

    // Schema pass: sorts.
    let mut sorts: Vec<BoundSort> = Vec::new();
    let mut seen_sorts: Vec<&str> = Vec::new();
    for raw in &request.sorts {
        let field = schema.sort_field(&raw.field).ok_or_else(|| {
            QuerierError::schema(format!("'{}' is not a sortable field", raw.field))
        })?;
        if seen_sorts.contains(&raw.field.as_str()) {
            return Err(QuerierError::invalid(format!(
                "sort:{} given more than once",
                raw.field
            )));
        }
        seen_sorts.push(&raw.field);
        sorts.push(BoundSort {
            column: field.column.clone(),
            direction: parse_direction(&raw.field, &raw.direction, schema.default_direction())?,
        });
    }

    // Schema pass: page attributes.
    let mut pending_page: Vec<(PageAttr, String)> = Vec::new();
    for raw in &request.page {
        if !schema.page_enabled() {
            return Err(QuerierError::schema("pagination is not enabled for this query"));
        }
        let attr = PageAttr::from_name(&raw.attr).ok_or_else(|| {
            QuerierError::schema(format!("'page:{}' is not a page attribute", raw.attr))
        })?;
        if pending_page.iter().any(|(a, _)| *a == attr) {
            return Err(QuerierError::invalid(format!(
                "page:{} given more than once",
                attr.name()
            )));
        }
        pending_page.push((attr, raw.value.clone()));
    }

    // Rule pass, in declaration order.
    let mut page_number: Option<i64> = None;
    let mut page_size: Option<i64> = None;
    let base = base_rules();
    for (key, constraint) in base.iter().chain(rules.iter()) {
        match key {
            RuleKey::Filter { .. } => {
                for filter in pending.iter_mut().filter(|p| p.key == *key) {
                    filter.value = Some(constraint.check(&key.label(), &filter.raw)?);
                }
            }
            RuleKey::Page(attr) => {
                if let Some((_, raw)) = pending_page.iter().find(|(a, _)| a == attr) {
                    let checked = constraint.check(&key.label(), raw)?;
                    let n = checked.as_i64().ok_or_else(|| {
                        QuerierError::invalid(format!("{} must be a number", key.label()))
                    })?;
                    match attr {
                        PageAttr::Number => page_number = Some(n),
                        PageAttr::Size => page_size = Some(n),
                    }
                }
            }
        }
    }

    // Assemble: unruled filter values bind as text, defaults fill the gaps.
    let filters = pending
        .into_iter()
        .map(|p| BoundFilter {
            column: p.column,
            op: p.op,
            value: p.value.unwrap_or(Value::String(p.raw)),
        })
        .collect();

    let sorts = if sorts.is_empty() {
        match schema.default_sort() {
            Some((column, direction)) => vec![BoundSort {
                column: column.clone(),
                direction: *direction,
            }],
            None => Vec::new(),
        }
    } else {
        sorts
    };

    let page = if schema.page_enabled() {
        let default = schema.default_page();
        Some(Page {
            number: page_field(page_number, default.number, "page:number")?,
            size: page_field(page_size, default.size, "page:size")?,
        })
    } else {
        None
    };

    Ok(ValidatedQuery {
        filters,
        sorts,
        page,
    })
}

fn parse_direction(
    field: &str,
    raw: &str,
    default: SortDirection,
) -> Result<SortDirection, QuerierError> {
    if raw.is_empty() {
        return Ok(default);
    }
    if raw.eq_ignore_ascii_case("asc") {
        Ok(SortDirection::Asc)
    } else if raw.eq_ignore_ascii_case("desc") {
        Ok(SortDirection::Desc)
    } else {
        Err(QuerierError::invalid(format!(
            "sort:{} direction must be 'asc' or 'desc' (got '{}')",
            field, raw
        )))
    }
}

fn page_field(value: Option<i64>, fallback: u32, label: &str) -> Result<u32, QuerierError> {
    match value {
        None => Ok(fallback),
        Some(n) => u32::try_from(n)
            .map_err(|_| QuerierError::invalid(format!("{} is out of range (got {})", label, n))),
    }
}


#[cfg(test)]
mod validate_tests {
    use super::*;
    use crate::querier::types::{RawFilter, RawPage, RawSort};

    fn schema() -> QuerySchema {
        QuerySchema::builder()
            .filter("visible", "posts.visible", &[FilterOp::Eq])
            .filter("room_id", "rooms_to_posts.room_id", &[FilterOp::Eq])
            .sort("likes", "posts.likes")
            .sort("created_at", "posts.created_at")
            .default_sort("created_at", SortDirection::Desc)
            .default_direction(SortDirection::Desc)
            .page(true)
            .build()
            .unwrap()
    }

    fn rules() -> RuleSet {
        RuleSet::new()
            .rule(
                RuleKey::filter("visible", FilterOp::Eq),
                Constraint::number().one_of(&[0, 1]),
            )
            .rule(RuleKey::filter("room_id", FilterOp::Eq), Constraint::number())
            .rule(RuleKey::page(PageAttr::Size), Constraint::number().max(100))
    }

    fn filter(field: &str, op: Option<&str>, value: &str) -> RawFilter {
        RawFilter {
            field: field.to_string(),
            op: op.map(str::to_string),
            value: value.to_string(),
        }
    }

    fn run(request: QueryRequest) -> Result<ValidatedQuery, QuerierError> {
        validate(&schema(), &rules(), &request)
    }

    #[test]
    fn resolves_columns_and_normalizes_values() {
        let query = run(QueryRequest {
            filters: vec![
                filter("visible", Some("="), "1"),
                filter("room_id", Some("="), "5"),
            ],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].column, "posts.visible");
        assert_eq!(query.filters[0].value, Value::Number(1.into()));
        assert_eq!(query.filters[1].column, "rooms_to_posts.room_id");
        assert_eq!(query.filters[1].value, Value::Number(5.into()));
    }

    #[test]
    fn empty_request_gets_the_defaults() {
        let query = run(QueryRequest::default()).unwrap();

        assert!(query.filters.is_empty());
        assert_eq!(query.sorts.len(), 1);
        assert_eq!(query.sorts[0].column, "posts.created_at");
        assert_eq!(query.sorts[0].direction, SortDirection::Desc);
        assert_eq!(query.page, Some(Page { number: 1, size: 10 }));
    }

    #[test]
    fn missing_operator_segment_means_equality() {
        let query = run(QueryRequest {
            filters: vec![filter("visible", None, "0")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.filters[0].op, FilterOp::Eq);
        assert_eq!(query.filters[0].value, Value::Number(0.into()));
    }

    #[test]
    fn unknown_filter_field_is_a_schema_violation() {
        let err = run(QueryRequest {
            filters: vec![filter("author", Some("="), "7")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");
        assert!(err.to_string().contains("'author' is not a filterable field"));
    }

    #[test]
    fn undeclared_operator_is_a_schema_violation() {
        let err = run(QueryRequest {
            filters: vec![filter("visible", Some(">"), "0")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn unsupported_operator_token_is_a_schema_violation() {
        let err = run(QueryRequest {
            filters: vec![filter("visible", Some("~"), "0")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn visible_outside_zero_one_fails_validation() {
        let err = run(QueryRequest {
            filters: vec![filter("visible", Some("="), "2")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::Validation(_)), "{err}");
        assert!(err.to_string().contains("filter:visible[=]"));
    }

    #[test]
    fn duplicate_filter_key_fails_validation() {
        let err = run(QueryRequest {
            filters: vec![
                filter("visible", Some("="), "1"),
                filter("visible", None, "0"),
            ],
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("given more than once"));
    }

    #[test]
    fn page_size_over_limit_is_rejected() {
        let err = run(QueryRequest {
            page: vec![RawPage {
                attr: "size".to_string(),
                value: "101".to_string(),
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::Validation(_)), "{err}");
        assert!(err.to_string().contains("must not exceed 100"));
    }

    #[test]
    fn page_values_must_be_positive_integers() {
        for value in ["0", "-1", "abc", "2.5", ""] {
            let err = run(QueryRequest {
                page: vec![RawPage {
                    attr: "size".to_string(),
                    value: value.to_string(),
                }],
                ..Default::default()
            })
            .unwrap_err();
            assert!(matches!(err, QuerierError::Validation(_)), "size={value}: {err}");
        }
    }

    #[test]
    fn unknown_page_attribute_is_a_schema_violation() {
        let err = run(QueryRequest {
            page: vec![RawPage {
                attr: "offset".to_string(),
                value: "3".to_string(),
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn page_params_fail_when_pagination_is_disabled() {
        let schema = QuerySchema::builder()
            .filter("visible", "posts.visible", &[FilterOp::Eq])
            .build()
            .unwrap();
        let err = validate(
            &schema,
            &RuleSet::new(),
            &QueryRequest {
                page: vec![RawPage {
                    attr: "size".to_string(),
                    value: "10".to_string(),
                }],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");

        // without page params the window is simply absent
        let query = validate(&schema, &RuleSet::new(), &QueryRequest::default()).unwrap();
        assert_eq!(query.page, None);
    }

    #[test]
    fn explicit_page_overrides_the_default() {
        let query = run(QueryRequest {
            page: vec![
                RawPage {
                    attr: "number".to_string(),
                    value: "3".to_string(),
                },
                RawPage {
                    attr: "size".to_string(),
                    value: "25".to_string(),
                },
            ],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.page, Some(Page { number: 3, size: 25 }));
    }

    #[test]
    fn sort_direction_parsing() {
        let sorted = |direction: &str| {
            run(QueryRequest {
                sorts: vec![RawSort {
                    field: "likes".to_string(),
                    direction: direction.to_string(),
                }],
                ..Default::default()
            })
        };

        assert_eq!(sorted("asc").unwrap().sorts[0].direction, SortDirection::Asc);
        assert_eq!(sorted("DESC").unwrap().sorts[0].direction, SortDirection::Desc);
        // empty direction falls back to the schema default
        assert_eq!(sorted("").unwrap().sorts[0].direction, SortDirection::Desc);

        let err = sorted("sideways").unwrap_err();
        assert!(matches!(err, QuerierError::Validation(_)), "{err}");
    }

    #[test]
    fn unknown_sort_field_is_a_schema_violation() {
        let err = run(QueryRequest {
            sorts: vec![RawSort {
                field: "karma".to_string(),
                direction: "asc".to_string(),
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, QuerierError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn explicit_sort_replaces_the_default() {
        let query = run(QueryRequest {
            sorts: vec![RawSort {
                field: "likes".to_string(),
                direction: "asc".to_string(),
            }],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.sorts.len(), 1);
        assert_eq!(query.sorts[0].column, "posts.likes");
        assert_eq!(query.sorts[0].direction, SortDirection::Asc);
    }

    #[test]
    fn page_number_beyond_u32_is_out_of_range() {
        let err = run(QueryRequest {
            page: vec![RawPage {
                attr: "number".to_string(),
                value: "4294967296".to_string(),
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn unruled_filter_values_bind_as_text() {
        let schema = QuerySchema::builder()
            .filter("username", "users.username", &[FilterOp::Eq])
            .build()
            .unwrap();
        let query = validate(
            &schema,
            &RuleSet::new(),
            &QueryRequest {
                filters: vec![filter("username", Some("="), "alice")],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(query.filters[0].value, Value::String("alice".to_string()));
    }
}
