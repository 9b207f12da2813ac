use thiserror::Error;

/// Errors raised while answering a query. The first two variants are request
/// faults and map to HTTP 400; `Store` covers everything below the SQL line.
#[derive(Error, Debug)]
pub enum QuerierError {
    /// The request referenced something the schema does not declare: an
    /// unknown filter or sort field, an operator a field does not allow, or a
    /// page attribute that does not exist.
    #[error("{0}")]
    SchemaViolation(String),

    /// A declared key carried a value that failed its validation rule.
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl QuerierError {
    pub fn schema(message: impl Into<String>) -> Self {
        QuerierError::SchemaViolation(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        QuerierError::Validation(message.into())
    }

    /// True for faults in the request itself rather than in the store.
    pub fn is_request_fault(&self) -> bool {
        matches!(
            self,
            QuerierError::SchemaViolation(_) | QuerierError::Validation(_)
        )
    }
}

/// Errors raised while building a schema. These surface at startup, not per
/// request, so they abort boot instead of mapping to a status code.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate filter field '{0}'")]
    DuplicateFilter(String),

    #[error("duplicate sort field '{0}'")]
    DuplicateSort(String),

    #[error("invalid column reference '{0}'")]
    InvalidColumn(String),

    #[error("filter field '{0}' declares no operators")]
    NoOperators(String),

    #[error("default sort '{0}' is not a declared sort field")]
    UnknownDefaultSort(String),

    #[error("default page size must be at least 1")]
    ZeroPageSize,
}

pub type QuerierResult<T> = Result<T, QuerierError>;
