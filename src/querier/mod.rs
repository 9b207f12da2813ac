pub mod error;
pub mod executor;
pub mod parse;
pub mod rules;
pub mod schema;
pub mod types;

pub use error::{QuerierError, QuerierResult, SchemaError};
pub use executor::{total_pages, Querier, Relation};
pub use rules::{Constraint, PageAttr, RuleKey, RuleSet};
pub use schema::QuerySchema;
pub use types::*;
