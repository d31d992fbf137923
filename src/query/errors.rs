//! # Query Rewrite Error Types
//!
//! Raised before any query is sent: unsupported base queries, invalid page
//! parameters and item keys that cannot be turned into a filter.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("Unable to parse query: {message}")]
    Parse { message: String },

    #[error("Unsupported query: {reason}")]
    UnsupportedQuery { reason: String },

    #[error("Parameter 'desc' requires parameter 'order_by'.")]
    DescWithoutOrderBy,

    #[error("Invalid page {page}: pages start at 1.")]
    InvalidPage { page: i64 },

    #[error("Invalid page size {size}: must be between 1 and {max}.")]
    InvalidSize { size: i64, max: i64 },

    #[error("Cannot order by '{order_by}'. Applicable keys: {applicable}")]
    InvalidOrderBy {
        order_by: String,
        applicable: String,
    },

    #[error("Unable to construct query: {message}")]
    Construction { message: String },

    #[error("Invalid item key: {reason}")]
    InvalidItemKey { reason: String },

    #[error("Key field '{field}' reads binding '?{binding}', which the query does not project.")]
    UnprojectedKeyBinding { field: String, binding: String },

    #[error("A filter literal takes either a datatype or a language tag, not both.")]
    ConflictingFilterTags,
}

impl QueryError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        QueryError::UnsupportedQuery {
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(message: impl Into<String>) -> Self {
        QueryError::Construction {
            message: message.into(),
        }
    }
}
