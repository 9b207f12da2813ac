use crate::querier::error::SchemaError;
use crate::querier::types::{FilterOp, Page, SortDirection};

/// A filterable field: the name clients use in `filter[<name>]`, the column
/// it maps to, and the operators it accepts.
#[derive(Debug, Clone)]
pub struct FilterField {
    pub name: String,
    pub column: String,
    pub ops: Vec<FilterOp>,
}

/// A sortable field: the name clients use in `sort[<name>]` and its column.
#[derive(Debug, Clone)]
pub struct SortField {
    pub name: String,
    pub column: String,
}

/// Static description of what a query endpoint accepts. Built once at
/// startup, read-only afterwards; everything the validator and the SQL
/// generator know about fields comes from here, never from the request.
#[derive(Debug, Clone)]
pub struct QuerySchema {
    filters: Vec<FilterField>,
    sorts: Vec<SortField>,
    page_enabled: bool,
    default_sort: Option<(String, SortDirection)>,
    default_direction: SortDirection,
    default_page: Page,
}

impl QuerySchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn filter_field(&self, name: &str) -> Option<&FilterField> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn sort_field(&self, name: &str) -> Option<&SortField> {
        self.sorts.iter().find(|s| s.name == name)
    }

    pub fn page_enabled(&self) -> bool {
        self.page_enabled
    }

    /// Default ordering as `(column, direction)`, resolved at build time.
    pub fn default_sort(&self) -> Option<&(String, SortDirection)> {
        self.default_sort.as_ref()
    }

    /// Direction used when a sort field is given with an empty value.
    pub fn default_direction(&self) -> SortDirection {
        self.default_direction
    }

    pub fn default_page(&self) -> Page {
        self.default_page
    }
}

/// Builder for [`QuerySchema`]. Declaration mistakes (duplicate fields, bad
/// column references, a default sort that was never declared) are reported by
/// `build()` so the process refuses to start instead of misbehaving per
/// request.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    filters: Vec<FilterField>,
    sorts: Vec<SortField>,
    page_enabled: bool,
    default_sort: Option<(String, SortDirection)>,
    default_direction: SortDirection,
    default_page: Page,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a filterable field and the operators it accepts.
    pub fn filter(mut self, name: &str, column: &str, ops: &[FilterOp]) -> Self {
        self.filters.push(FilterField {
            name: name.to_string(),
            column: column.to_string(),
            ops: ops.to_vec(),
        });
        self
    }

    /// Declare a sortable field.
    pub fn sort(mut self, name: &str, column: &str) -> Self {
        self.sorts.push(SortField {
            name: name.to_string(),
            column: column.to_string(),
        });
        self
    }

    /// Enable or disable `page[number]` / `page[size]` handling.
    pub fn page(mut self, enabled: bool) -> Self {
        self.page_enabled = enabled;
        self
    }

    /// Ordering applied when the request carries no sort at all. The field
    /// must also be declared via `sort()`.
    pub fn default_sort(mut self, name: &str, direction: SortDirection) -> Self {
        self.default_sort = Some((name.to_string(), direction));
        self
    }

    /// Direction applied when a sort field arrives with an empty value.
    pub fn default_direction(mut self, direction: SortDirection) -> Self {
        self.default_direction = direction;
        self
    }

    pub fn default_page(mut self, number: u32, size: u32) -> Self {
        self.default_page = Page { number, size };
        self
    }

    pub fn build(self) -> Result<QuerySchema, SchemaError> {
        for (i, field) in self.filters.iter().enumerate() {
            if self.filters[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateFilter(field.name.clone()));
            }
            validate_column(&field.column)?;
            if field.ops.is_empty() {
                return Err(SchemaError::NoOperators(field.name.clone()));
            }
        }
        for (i, field) in self.sorts.iter().enumerate() {
            if self.sorts[..i].iter().any(|s| s.name == field.name) {
                return Err(SchemaError::DuplicateSort(field.name.clone()));
            }
            validate_column(&field.column)?;
        }
        if self.default_page.size == 0 || self.default_page.number == 0 {
            return Err(SchemaError::ZeroPageSize);
        }

        // Resolve the default sort name to its column up front.
        let default_sort = match self.default_sort {
            Some((name, direction)) => {
                let field = self
                    .sorts
                    .iter()
                    .find(|s| s.name == name)
                    .ok_or(SchemaError::UnknownDefaultSort(name))?;
                Some((field.column.clone(), direction))
            }
            None => None,
        };

        Ok(QuerySchema {
            filters: self.filters,
            sorts: self.sorts,
            page_enabled: self.page_enabled,
            default_sort,
            default_direction: self.default_direction,
            default_page: self.default_page,
        })
    }
}

/// Columns are declared in code, not taken from requests, but a typo here
/// would otherwise surface as a runtime SQL error. Accept `ident` or
/// `table.ident` where each part starts with a letter or underscore and
/// contains only alphanumerics and underscores.
fn validate_column(column: &str) -> Result<(), SchemaError> {
    let parts: Vec<&str> = column.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return Err(SchemaError::InvalidColumn(column.to_string()));
    }
    for part in parts {
        let mut chars = part.chars();
        let valid_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_first || !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SchemaError::InvalidColumn(column.to_string()));
        }
    }
    Ok(())
}
