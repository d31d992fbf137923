use serde::{Deserialize, Serialize};
use validator::Validate;

use super::errors::QueryError;

/// Upper bound for `size` unless the caller configures another one.
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 10_000;

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    100
}

/// Pagination and ordering parameters of a page request.
///
/// Deserializes from URL query strings (`?page=2&size=10&order_by=name&desc=true`).
/// `desc` is only meaningful together with `order_by`; an `order_by` without
/// `desc` orders ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QueryParameters {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: i64,

    #[serde(default = "default_size")]
    #[validate(range(min = 1, message = "Size must be at least 1"))]
    pub size: i64,

    #[serde(default)]
    pub order_by: Option<String>,

    #[serde(default)]
    pub desc: Option<bool>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
            order_by: None,
            desc: None,
        }
    }
}

impl QueryParameters {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page,
            size,
            ..Default::default()
        }
    }

    pub fn order_by(mut self, order_by: impl Into<String>, desc: Option<bool>) -> Self {
        self.order_by = Some(order_by.into());
        self.desc = desc;
        self
    }

    /// Validate the parameters against a page size cap.
    pub fn check(&self, max_size: i64) -> Result<(), QueryError> {
        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();
            if fields.contains_key("page") {
                return Err(QueryError::InvalidPage { page: self.page });
            }
            return Err(QueryError::InvalidSize {
                size: self.size,
                max: max_size,
            });
        }

        if self.size > max_size {
            return Err(QueryError::InvalidSize {
                size: self.size,
                max: max_size,
            });
        }

        if self.desc.is_some() && self.order_by.is_none() {
            return Err(QueryError::DescWithoutOrderBy);
        }

        Ok(())
    }

    pub fn limit(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }

    /// Row (or group) offset of the first item on the page.
    pub fn offset(&self) -> u64 {
        u64::try_from(self.size.saturating_mul(self.page - 1)).unwrap_or(0)
    }
}
